use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::prefix::Prefix;
use crate::shared::ASN;

/// Best route an AS holds for one prefix.
///
/// `as_path` starts with the AS holding the route, then the neighbor it was
/// learned from, and ends with the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub as_path: Vec<ASN>,
    pub hijack: bool,
    /// Installed by the partial-visibility repair, outside Gao-Rexford.
    #[serde(default)]
    pub forced: bool,
}

impl Route {
    pub fn new(as_path: Vec<ASN>, hijack: bool) -> Self {
        Route {
            as_path,
            hijack,
            forced: false,
        }
    }

    pub fn new_forced(as_path: Vec<ASN>, hijack: bool) -> Self {
        Route {
            as_path,
            hijack,
            forced: true,
        }
    }

    /// Neighbor the route was learned from.
    pub fn next_hop(&self) -> Option<ASN> {
        self.as_path.get(1).copied()
    }
}

pub type LocalRIB = BTreeMap<Prefix, Route>;

/// Outcome of running the local decision function on one announcement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDecision {
    pub forward_to: BTreeSet<ASN>,
    pub new_path: Vec<ASN>,
    pub accepted: Vec<Prefix>,
}

/// Announcement waiting in the propagation work-queue.
#[derive(Debug, Clone)]
pub struct AnnInfo {
    pub receiver: ASN,
    pub as_path: Vec<ASN>,
    pub prefixes: Vec<Prefix>,
}

impl AnnInfo {
    pub fn new(receiver: ASN, as_path: Vec<ASN>, prefixes: Vec<Prefix>) -> Self {
        AnnInfo {
            receiver,
            as_path,
            prefixes,
        }
    }
}

/// What an AS announced in the most recent flood of a given kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    pub origin: ASN,
    pub as_path: Vec<ASN>,
    pub prefixes: BTreeSet<Prefix>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_endpoints() {
        let route = Route::new(vec![3, 2, 1], false);
        assert_eq!(route.next_hop(), Some(2));

        assert!(!route.forced);

        let direct = Route::new(vec![2], false);
        assert_eq!(direct.next_hop(), None);
        assert!(Route::new_forced(vec![2], true).forced);
    }
}
