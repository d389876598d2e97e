use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::iter;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::as_graph::NetworkGraph;
use crate::prefix::Prefix;
use crate::shared::{Relationships, UsageError, ASN};
use crate::simulation_engine::announcement::{AnnInfo, AnnouncementRecord};
use crate::simulation_engine::policy::policy_for;

/// Prefixes a vantage point must export to count as a full-table feed.
pub const FULL_ROUTE_THRESHOLD: u64 = 100_000;

/// Number of sweeps of the partial-visibility repair.
const REPAIR_ITERATIONS: usize = 2;

const REPAIR_SCAN_ORDER: [Relationships; 4] = [
    Relationships::Providers,
    Relationships::Peers,
    Relationships::Siblings,
    Relationships::Customers,
];

#[derive(Debug, Clone, Default)]
pub struct PropagationOptions {
    /// Run the repair pass after the flood.
    pub repair_partial_visibility: bool,
    /// Extra copies of the origin ASN prepended toward a given neighbor.
    pub origin_prepend: BTreeMap<ASN, usize>,
}

impl PropagationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair_partial_visibility = repair;
        self
    }

    pub fn with_origin_prepend(mut self, prepend: BTreeMap<ASN, usize>) -> Self {
        self.origin_prepend = prepend;
        self
    }
}

/// How the ROV-enabled ASes are chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum RovSelection {
    /// Percentage of all known ASes, in `(0, 100]`.
    Percentage(f64),
    Asns(Vec<ASN>),
}

impl RovSelection {
    /// Builds a selection from the two optional inputs. Exactly one of them
    /// must be given; `0` and an empty list count as absent.
    pub fn from_parts(
        percentage: Option<f64>,
        asns: Option<Vec<ASN>>,
    ) -> Result<RovSelection, UsageError> {
        let percentage = percentage.filter(|p| *p != 0.0);
        let asns = asns.filter(|list| !list.is_empty());

        match (percentage, asns) {
            (Some(p), None) => {
                if !(p > 0.0 && p <= 100.0) {
                    return Err(UsageError::InvalidPercentage(p));
                }
                Ok(RovSelection::Percentage(p))
            }
            (None, Some(list)) => Ok(RovSelection::Asns(list)),
            _ => Err(UsageError::RovSelectionConflict),
        }
    }
}

impl NetworkGraph {
    /// Floods the prefixes originated (or hijacked) by `origin` to fixpoint.
    ///
    /// Returns the ASes that never received an announcement.
    pub fn propagate(&mut self, origin: ASN, is_hijack: bool) -> BTreeSet<ASN> {
        self.propagate_with(origin, is_hijack, &PropagationOptions::default())
    }

    pub fn propagate_with(
        &mut self,
        origin: ASN,
        is_hijack: bool,
        options: &PropagationOptions,
    ) -> BTreeSet<ASN> {
        let mut without_route: BTreeSet<ASN> = self.nodes.keys().copied().collect();
        let kind = if is_hijack { "hijacked" } else { "legitimate" };

        let Some(origin_node) = self.nodes.get(&origin) else {
            log::warn!("AS{} not found in the graph, nothing to propagate", origin);
            return without_route;
        };

        let (prefixes, base_path): (BTreeSet<Prefix>, Vec<ASN>) = if is_hijack {
            let mut path = vec![origin];
            path.extend_from_slice(&origin_node.forged_path);
            (origin_node.hijacked_prefixes.clone(), path)
        } else {
            (origin_node.announced_prefixes.clone(), vec![origin])
        };
        let neighbors = origin_node.neighbors();

        let record = AnnouncementRecord {
            origin,
            as_path: base_path.clone(),
            prefixes: prefixes.clone(),
        };
        if is_hijack {
            self.last_hijack_announce = Some(record);
        } else {
            self.last_legitimate_announce = Some(record);
        }

        if prefixes.is_empty() {
            log::warn!("No {} route to propagate from AS{}", kind, origin);
            return without_route;
        }

        let prefixes: Vec<Prefix> = prefixes.into_iter().collect();
        let mut queue: VecDeque<AnnInfo> = VecDeque::new();
        for neighbor in neighbors {
            let extra = options.origin_prepend.get(&neighbor).copied().unwrap_or(0);
            let mut path: Vec<ASN> = iter::repeat(origin).take(extra).collect();
            path.extend_from_slice(&base_path);
            queue.push_back(AnnInfo::new(neighbor, path, prefixes.clone()));
        }

        let mut reached = BTreeSet::new();
        while let Some(ann) = queue.pop_front() {
            reached.insert(ann.receiver);

            let Some(node) = self.nodes.get_mut(&ann.receiver) else {
                log::error!("AS{} is referenced as a neighbor but missing from the graph", ann.receiver);
                continue;
            };

            let policy = policy_for(node.rov_enabled);
            let candidates: Vec<Prefix> = ann
                .prefixes
                .iter()
                .filter(|prefix| {
                    policy.validate_announcement(prefix, &ann.as_path, ann.receiver, &self.roa)
                })
                .copied()
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let decision = node.evaluate_route(&candidates, &ann.as_path, is_hijack, true);
            if decision.accepted.is_empty() {
                continue;
            }
            for next in decision.forward_to {
                queue.push_back(AnnInfo::new(
                    next,
                    decision.new_path.clone(),
                    decision.accepted.clone(),
                ));
            }
        }

        for asn in &reached {
            without_route.remove(asn);
        }
        log::info!(
            "{} routes propagated from AS{} to {} ASes, {} AS(es) not reached",
            kind,
            origin,
            reached.len(),
            without_route.len()
        );

        if options.repair_partial_visibility {
            let forced = self.repair_partial_visibility(&prefixes);
            log::info!("{} more AS(es) took a route outside the Gao-Rexford model", forced.len());
        }

        without_route
    }

    /// Propagates the legitimate and then the hijacked prefixes of every AS.
    pub fn propagate_all(&mut self) {
        for asn in self.asns() {
            self.propagate(asn, false);
            self.propagate(asn, true);
        }
    }

    /// Gives a route to every AS still lacking one for `prefixes`, copying
    /// it from a neighbor regardless of the export policy.
    ///
    /// Returns the ASes that received such a forced route. They are also
    /// added to `policy_violations`.
    pub fn repair_partial_visibility(&mut self, prefixes: &[Prefix]) -> BTreeSet<ASN> {
        let mut forced = BTreeSet::new();
        let asns = self.asns();

        for _ in 0..REPAIR_ITERATIONS {
            let mut still_missing = false;

            for &asn in &asns {
                for prefix in prefixes {
                    let Some(node) = self.nodes.get(&asn) else {
                        continue;
                    };
                    if node.rib.contains_key(prefix) {
                        continue;
                    }

                    let rov_enabled = node.rov_enabled;
                    let candidate = REPAIR_SCAN_ORDER
                        .iter()
                        .flat_map(|rel| node.get_neighbors(*rel).iter().map(move |n| (*n, *rel)))
                        .find_map(|(neighbor, rel)| {
                            let route = self.nodes.get(&neighbor)?.rib.get(prefix)?;
                            if route.as_path.contains(&asn) {
                                return None;
                            }
                            if !policy_for(rov_enabled).validate_announcement(
                                prefix,
                                &route.as_path,
                                asn,
                                &self.roa,
                            ) {
                                return None;
                            }
                            Some((neighbor, rel, route.as_path.clone(), route.hijack))
                        });

                    match candidate {
                        Some((neighbor, rel, path, hijack)) => {
                            log::debug!(
                                "Gao-Rexford violation: AS{} took route to {} from AS{} ({})",
                                asn,
                                prefix,
                                neighbor,
                                rel
                            );
                            if let Some(node) = self.nodes.get_mut(&asn) {
                                node.force_route(*prefix, &path, hijack);
                            }
                            forced.insert(asn);
                        }
                        None => still_missing = true,
                    }
                }
            }

            if !still_missing {
                break;
            }
        }

        self.policy_violations.extend(forced.iter().copied());
        forced
    }

    /// Enables ROV on the selected ASes. Returns how many were enabled.
    pub fn enable_rov(&mut self, selection: &RovSelection) -> Result<usize, UsageError> {
        self.enable_rov_with_rng(selection, &mut rand::thread_rng())
    }

    pub fn enable_rov_with_rng<R: Rng + ?Sized>(
        &mut self,
        selection: &RovSelection,
        rng: &mut R,
    ) -> Result<usize, UsageError> {
        let selected: Vec<ASN> = match selection {
            RovSelection::Percentage(p) => {
                if !(*p > 0.0 && *p <= 100.0) {
                    return Err(UsageError::InvalidPercentage(*p));
                }
                let asns = self.asns();
                let n = ((*p / 100.0) * asns.len() as f64) as usize;
                asns.choose_multiple(rng, n).copied().collect()
            }
            RovSelection::Asns(list) => list.clone(),
        };

        let mut enabled = 0;
        for asn in &selected {
            match self.nodes.get_mut(asn) {
                Some(node) => {
                    node.rov_enabled = true;
                    enabled += 1;
                }
                None => log::warn!("AS{} not found in the graph to enable ROV", asn),
            }
        }
        log::info!("ROV enabled in {} of {} ASes", enabled, self.nodes.len());
        self.rov_asns = selected;
        Ok(enabled)
    }

    /// ASes holding a hijacked route, using the default full-table threshold.
    pub fn check_hijack_exposure(&mut self) -> BTreeSet<ASN> {
        self.check_hijack_exposure_with(FULL_ROUTE_THRESHOLD)
    }

    /// Collects every AS with a hijacked route and the vantage points that
    /// would show it to a collector.
    ///
    /// A VP exporting at least `full_route_threshold` prefixes sees all its
    /// routes. A smaller VP only exports customer routes, so it counts when a
    /// hijacked route was learned from a customer.
    pub fn check_hijack_exposure_with(&mut self, full_route_threshold: u64) -> BTreeSet<ASN> {
        let mut hijacked = BTreeSet::new();
        let mut vantage_points = BTreeSet::new();

        for node in self.nodes.values() {
            let routes: Vec<_> = node.rib.values().filter(|route| route.hijack).collect();
            if routes.is_empty() {
                continue;
            }
            hijacked.insert(node.asn);

            if node.exported_route_count >= full_route_threshold {
                vantage_points.insert(node.asn);
            } else if node.exported_route_count > 0
                && routes.iter().any(|route| {
                    route
                        .next_hop()
                        .map_or(false, |hop| node.customers.contains(&hop))
                })
            {
                vantage_points.insert(node.asn);
            }
        }

        log::info!("{}/{} ASes got hijacked prefixes", hijacked.len(), self.nodes.len());
        log::info!("{} VPs exported the hijacked route to the collectors", vantage_points.len());

        self.hijacked_asns = hijacked.clone();
        self.vantage_points_hijacked = vantage_points;
        self.hijack_checked = true;
        hijacked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rov_selection_modes() {
        assert_eq!(
            RovSelection::from_parts(Some(0.0), Some(vec![])),
            Err(UsageError::RovSelectionConflict)
        );
        assert_eq!(
            RovSelection::from_parts(Some(10.0), Some(vec![1])),
            Err(UsageError::RovSelectionConflict)
        );
        assert_eq!(
            RovSelection::from_parts(Some(120.0), None),
            Err(UsageError::InvalidPercentage(120.0))
        );
        assert_eq!(
            RovSelection::from_parts(None, Some(vec![3, 4])),
            Ok(RovSelection::Asns(vec![3, 4]))
        );
    }
}
