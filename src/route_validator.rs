use std::collections::{BTreeMap, BTreeSet};

use crate::prefix::Prefix;
use crate::shared::{ROAValidity, ASN};

/// Route Origin Authorization: the ASes allowed to originate one exact prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ROA {
    pub prefix: Prefix,
    pub origin: ASN,
}

impl ROA {
    pub fn new(prefix: Prefix, origin: ASN) -> Self {
        ROA { prefix, origin }
    }
}

/// ROA registry keyed on the canonical prefix.
///
/// Matching is exact: a ROA for 10.0.0.0/16 says nothing about 10.0.0.0/24.
#[derive(Debug, Clone, Default)]
pub struct RouteValidator {
    roas: BTreeMap<Prefix, BTreeSet<ASN>>,
}

impl RouteValidator {
    pub fn new() -> Self {
        RouteValidator {
            roas: BTreeMap::new(),
        }
    }

    pub fn add_roa(&mut self, roa: ROA) {
        self.register(roa.prefix, roa.origin);
    }

    pub fn register(&mut self, prefix: Prefix, asn: ASN) {
        self.roas.entry(prefix).or_default().insert(asn);
    }

    pub fn authorized_origins(&self, prefix: &Prefix) -> Option<&BTreeSet<ASN>> {
        self.roas.get(prefix)
    }

    pub fn get_validity(&self, prefix: &Prefix, origin: ASN) -> ROAValidity {
        match self.roas.get(prefix) {
            None => ROAValidity::Unknown,
            Some(origins) if origins.contains(&origin) => ROAValidity::Valid,
            Some(_) => ROAValidity::InvalidOrigin,
        }
    }

    pub fn len(&self) -> usize {
        self.roas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roas.is_empty()
    }

    pub fn clear(&mut self) {
        self.roas.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &BTreeSet<ASN>)> {
        self.roas.iter()
    }
}
