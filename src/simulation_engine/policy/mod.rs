pub mod policy_extensions;

use crate::prefix::Prefix;
use crate::route_validator::RouteValidator;
use crate::shared::{Relationships, ASN};

/// Result of ranking a new route against the one already installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalPreference {
    Replace,
    /// Same relationship class; the shorter path wins, ties keep the old route.
    CompareLength,
    Keep,
}

/// Gao-Rexford local preference: customer > {peer, sibling} > provider, and
/// peer > sibling.
pub fn local_preference(new: Relationships, existing: Relationships) -> LocalPreference {
    use Relationships::*;

    match (new, existing) {
        (Customers, Customers) => LocalPreference::CompareLength,
        (Customers, _) => LocalPreference::Replace,
        (Peers | Siblings, Providers) => LocalPreference::Replace,
        (Peers, Siblings) => LocalPreference::Replace,
        (Peers, Peers) | (Providers, Providers) | (Siblings, Siblings) => {
            LocalPreference::CompareLength
        }
        _ => LocalPreference::Keep,
    }
}

/// Neighbor classes a route may be exported to, by the class it was learned from.
///
/// Returns `None` when the valley-free model has no export rule for it.
pub fn export_relationships(learned_from: Relationships) -> Option<&'static [Relationships]> {
    match learned_from {
        Relationships::Customers => Some(&[
            Relationships::Providers,
            Relationships::Peers,
            Relationships::Customers,
            Relationships::Siblings,
        ]),
        Relationships::Providers | Relationships::Peers => {
            Some(&[Relationships::Customers, Relationships::Siblings])
        }
        _ => None,
    }
}

/// Ingestion filter applied before the local decision function.
pub trait PolicyExtension: Send + Sync {
    /// Whether `receiver` lets an announcement of `prefix` along `as_path` in.
    fn validate_announcement(
        &self,
        _prefix: &Prefix,
        _as_path: &[ASN],
        _receiver: ASN,
        _route_validator: &RouteValidator,
    ) -> bool {
        true
    }

    fn name(&self) -> &str;
}

pub fn policy_for(rov_enabled: bool) -> &'static dyn PolicyExtension {
    if rov_enabled {
        &policy_extensions::rov::ROVPolicy
    } else {
        &policy_extensions::bgp::BGPPolicy
    }
}
