use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::prefix::Prefix;
use crate::route_validator::RouteValidator;
use crate::shared::{Relationships, TopologyError, ASN};
use crate::simulation_engine::announcement::{AnnouncementRecord, LocalRIB, Route, RouteDecision};
use crate::simulation_engine::policy::{export_relationships, local_preference, LocalPreference};

/// One Autonomous System: its neighbors (by ASN), its RIB and its role in the
/// current scenario.
#[derive(Debug, Clone, Default)]
pub struct ASNode {
    pub asn: ASN,
    pub providers: BTreeSet<ASN>,
    pub peers: BTreeSet<ASN>,
    pub customers: BTreeSet<ASN>,
    pub siblings: BTreeSet<ASN>,
    pub rib: LocalRIB,
    pub announced_prefixes: BTreeSet<Prefix>,
    pub hijacked_prefixes: BTreeSet<Prefix>,
    pub forged_path: Vec<ASN>,
    pub rov_enabled: bool,
    /// Prefixes this AS exports to public route collectors; 0 if it is not a VP.
    pub exported_route_count: u64,
    pub tier_1: bool,
    pub ixp: bool,
    pub description: String,
    pub country: String,
    pub continent: String,
}

impl ASNode {
    pub fn new(asn: ASN) -> Self {
        ASNode {
            asn,
            ..Default::default()
        }
    }

    pub fn from_asn_sets(
        asn: ASN,
        peer_asns: impl IntoIterator<Item = ASN>,
        provider_asns: impl IntoIterator<Item = ASN>,
        customer_asns: impl IntoIterator<Item = ASN>,
    ) -> Self {
        ASNode {
            asn,
            peers: peer_asns.into_iter().collect(),
            providers: provider_asns.into_iter().collect(),
            customers: customer_asns.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn add_provider(&mut self, provider: ASN) {
        self.providers.insert(provider);
    }

    pub fn add_peer(&mut self, peer: ASN) {
        self.peers.insert(peer);
    }

    pub fn add_customer(&mut self, customer: ASN) {
        self.customers.insert(customer);
    }

    pub fn add_sibling(&mut self, sibling: ASN) {
        self.siblings.insert(sibling);
    }

    pub fn get_neighbors(&self, rel: Relationships) -> &BTreeSet<ASN> {
        static EMPTY: BTreeSet<ASN> = BTreeSet::new();
        match rel {
            Relationships::Providers => &self.providers,
            Relationships::Peers => &self.peers,
            Relationships::Customers => &self.customers,
            Relationships::Siblings => &self.siblings,
            _ => &EMPTY,
        }
    }

    pub fn neighbors(&self) -> BTreeSet<ASN> {
        let mut result = BTreeSet::new();
        result.extend(&self.providers);
        result.extend(&self.peers);
        result.extend(&self.customers);
        result.extend(&self.siblings);
        result
    }

    pub fn relationship_to(&self, asn: ASN) -> Relationships {
        if self.customers.contains(&asn) {
            Relationships::Customers
        } else if self.peers.contains(&asn) {
            Relationships::Peers
        } else if self.siblings.contains(&asn) {
            Relationships::Siblings
        } else if self.providers.contains(&asn) {
            Relationships::Providers
        } else {
            Relationships::Unknown
        }
    }

    /// Number of providers, peers and customers. Siblings are not counted.
    pub fn degree(&self) -> usize {
        self.customers.len() + self.providers.len() + self.peers.len()
    }

    pub fn add_prefix(&mut self, prefix: Prefix) {
        self.announced_prefixes.insert(prefix);
    }

    /// Marks `prefix` as hijacked by this AS. Refused when this AS already
    /// originates the prefix legitimately.
    pub fn hijack(&mut self, prefix: Prefix, forged_path: Vec<ASN>) -> bool {
        if self.announced_prefixes.contains(&prefix) {
            return false;
        }
        self.hijacked_prefixes.insert(prefix);
        self.forged_path = forged_path;
        true
    }

    pub fn set_vantage_point(&mut self, exported_route_count: u64) {
        self.exported_route_count = exported_route_count;
    }

    pub fn is_vantage_point(&self) -> bool {
        self.exported_route_count > 0
    }

    /// Local decision function for one announcement.
    ///
    /// `candidate_path` is the path as sent by the neighbor: neighbor first,
    /// origin last. Installed routes carry the path with this AS prepended.
    pub fn evaluate_route(
        &mut self,
        candidate_prefixes: &[Prefix],
        candidate_path: &[ASN],
        is_hijack: bool,
        reject_on_loop: bool,
    ) -> RouteDecision {
        let mut new_path = Vec::with_capacity(candidate_path.len() + 1);
        new_path.push(self.asn);
        new_path.extend_from_slice(candidate_path);

        let mut decision = RouteDecision {
            new_path,
            ..Default::default()
        };

        let Some(&neighbor) = candidate_path.first() else {
            log::error!("AS{} received an announcement with an empty AS path", self.asn);
            return decision;
        };

        let relation = self.relationship_to(neighbor);
        if relation == Relationships::Unknown {
            log::error!(
                "AS{} received an announcement from AS{}, which is not a neighbor",
                self.asn,
                neighbor
            );
            return decision;
        }

        if reject_on_loop && candidate_path.contains(&self.asn) {
            log::trace!(
                "Route ignored by BGP (loop). AS{} -> AS path {:?}",
                self.asn,
                candidate_path
            );
            return decision;
        }

        for prefix in candidate_prefixes {
            let replace = match self.rib.get(prefix) {
                None => true,
                Some(existing) => {
                    let last_relation = existing
                        .next_hop()
                        .map(|asn| self.relationship_to(asn))
                        .unwrap_or(Relationships::Unknown);
                    match local_preference(relation, last_relation) {
                        LocalPreference::Replace => true,
                        LocalPreference::CompareLength => {
                            decision.new_path.len() < existing.as_path.len()
                        }
                        LocalPreference::Keep => false,
                    }
                }
            };

            if replace {
                self.rib
                    .insert(*prefix, Route::new(decision.new_path.clone(), is_hijack));
                decision.accepted.push(*prefix);
            }
        }

        if decision.accepted.is_empty() {
            return decision;
        }

        match export_relationships(relation) {
            Some(classes) => {
                for rel in classes {
                    decision.forward_to.extend(self.get_neighbors(*rel));
                }
                decision.forward_to.remove(&neighbor);
            }
            None => log::error!(
                "AS{} has no export rule for a route learned from {} AS{}",
                self.asn,
                relation,
                neighbor
            ),
        }

        decision
    }

    /// Installs a route without running local preference. Used by the
    /// partial-visibility repair pass only.
    pub(crate) fn force_route(&mut self, prefix: Prefix, neighbor_path: &[ASN], hijack: bool) {
        let mut as_path = Vec::with_capacity(neighbor_path.len() + 1);
        as_path.push(self.asn);
        as_path.extend_from_slice(neighbor_path);
        self.rib.insert(prefix, Route::new_forced(as_path, hijack));
    }

    /// Routes currently flagged as hijacked.
    pub fn hijacked_routes(&self) -> Vec<(Prefix, &Route)> {
        self.rib
            .iter()
            .filter(|(_, route)| route.hijack)
            .map(|(prefix, route)| (*prefix, route))
            .collect()
    }

    pub fn has_forced_route(&self) -> bool {
        self.rib.values().any(|route| route.forced)
    }

    pub fn has_hijack(&self) -> bool {
        self.rib.values().any(|route| route.hijack)
    }

    /// One line per RIB entry, sorted by prefix: `leg|hjk<TAB>prefix --> path`.
    pub fn rib_lines(&self) -> Vec<String> {
        self.rib
            .iter()
            .map(|(prefix, route)| {
                let tag = if route.hijack { "hjk" } else { "leg" };
                format!("{}\t{} --> {:?}", tag, prefix, route.as_path)
            })
            .collect()
    }

    pub fn clear_routes(&mut self) {
        self.rib.clear();
    }

    pub fn clear_prefixes(&mut self) {
        self.announced_prefixes.clear();
        self.hijacked_prefixes.clear();
        self.forged_path.clear();
    }

    pub fn clear_all(&mut self) {
        self.clear_prefixes();
        self.clear_routes();
        self.rov_enabled = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsInfo {
    pub asn: ASN,
    pub country: String,
    pub continent: String,
    pub degree: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationStats {
    pub count: usize,
    pub countries: usize,
    pub continents: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborStats {
    pub neighbors: RelationStats,
    pub customers: RelationStats,
    pub peers: RelationStats,
    pub providers: RelationStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyStats {
    pub total: usize,
    pub only_peers: usize,
    pub only_providers: usize,
    pub only_customers: usize,
}

/// The simulated Internet: every AS keyed by ASN, the ROA registry and the
/// bookkeeping of the scenario currently loaded.
///
/// Cloning produces a fully independent snapshot.
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    pub nodes: BTreeMap<ASN, ASNode>,
    pub roa: RouteValidator,
    pub last_legitimate_announce: Option<AnnouncementRecord>,
    pub last_hijack_announce: Option<AnnouncementRecord>,
    pub hijack_checked: bool,
    pub hijacked_asns: BTreeSet<ASN>,
    pub vantage_points_hijacked: BTreeSet<ASN>,
    /// Every AS a repair pass forced onto a route since the last restart,
    /// even if a later flood replaced that route.
    pub policy_violations: BTreeSet<ASN>,
    pub rov_asns: Vec<ASN>,
    pub tier_1: Vec<ASN>,
    pub tier_2: Vec<ASN>,
    pub ixp: Vec<ASN>,
    pub countries: BTreeSet<String>,
    pub continents: BTreeSet<String>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit deep copy for one scenario.
    pub fn snapshot(&self) -> NetworkGraph {
        self.clone()
    }

    pub fn get(&self, asn: &ASN) -> Option<&ASNode> {
        self.nodes.get(asn)
    }

    pub fn get_mut(&mut self, asn: &ASN) -> Option<&mut ASNode> {
        self.nodes.get_mut(asn)
    }

    pub fn contains(&self, asn: &ASN) -> bool {
        self.nodes.contains_key(asn)
    }

    pub fn insert(&mut self, node: ASNode) {
        self.nodes.insert(node.asn, node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ASNode> {
        self.nodes.values()
    }

    /// All ASNs, ascending.
    pub fn asns(&self) -> Vec<ASN> {
        self.nodes.keys().copied().collect()
    }

    pub(crate) fn ensure_node(&mut self, asn: ASN) -> &mut ASNode {
        self.nodes.entry(asn).or_insert_with(|| ASNode::new(asn))
    }

    pub fn add_provider_customer(&mut self, provider: ASN, customer: ASN) {
        self.ensure_node(provider).add_customer(customer);
        self.ensure_node(customer).add_provider(provider);
    }

    pub fn add_peering(&mut self, a: ASN, b: ASN) {
        self.ensure_node(a).add_peer(b);
        self.ensure_node(b).add_peer(a);
    }

    /// Adds one CAIDA-style record: code `-1` makes `asn1` the provider of
    /// `asn2`, code `0` makes them peers.
    pub fn add_relationship(&mut self, asn1: ASN, asn2: ASN, code: i32) -> Result<(), TopologyError> {
        match Relationships::from_caida_code(code) {
            Some(Relationships::Customers) => self.add_provider_customer(asn1, asn2),
            Some(Relationships::Peers) => self.add_peering(asn1, asn2),
            _ => return Err(TopologyError::UnknownRelationship(code)),
        }
        Ok(())
    }

    pub fn add_sibling(&mut self, asn: ASN, sibling: ASN) -> Result<(), TopologyError> {
        if !self.contains(&asn) {
            return Err(TopologyError::UnknownAsn(asn));
        }
        self.ensure_node(asn).add_sibling(sibling);
        self.ensure_node(sibling).add_sibling(asn);
        Ok(())
    }

    pub fn register_roa(&mut self, asn: ASN, prefix: Prefix) {
        self.roa.register(prefix, asn);
    }

    /// Makes `asn` originate `prefix`, optionally with a ROA for that pair.
    pub fn originate(&mut self, asn: ASN, prefix: Prefix, with_roa: bool) -> bool {
        let Some(node) = self.nodes.get_mut(&asn) else {
            log::warn!("AS{} not found in the graph, cannot announce {}", asn, prefix);
            return false;
        };
        node.add_prefix(prefix);
        if with_roa {
            self.register_roa(asn, prefix);
        }
        true
    }

    /// Makes `hijacker_asn` announce `prefix` behind `forged_path`.
    pub fn inject_hijack(&mut self, hijacker_asn: ASN, prefix: Prefix, forged_path: Vec<ASN>) -> bool {
        let Some(node) = self.nodes.get_mut(&hijacker_asn) else {
            log::warn!("AS{} not found in the graph, cannot hijack {}", hijacker_asn, prefix);
            return false;
        };
        if !node.hijack(prefix, forged_path) {
            log::warn!(
                "AS{} already announces {} legitimately, hijack ignored",
                hijacker_asn,
                prefix
            );
            return false;
        }
        true
    }

    pub fn forged_path(&self, asn: ASN) -> Option<Vec<ASN>> {
        self.nodes.get(&asn).map(|node| node.forged_path.clone())
    }

    /// ASes whose RIB still holds a route installed by the repair pass.
    pub fn forced_route_holders(&self) -> BTreeSet<ASN> {
        self.nodes
            .values()
            .filter(|node| node.has_forced_route())
            .map(|node| node.asn)
            .collect()
    }

    pub fn clear_all_routes(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_routes();
        }
    }

    /// Wipes all scenario state, keeping the topology and metadata.
    pub fn restart(&mut self) {
        for node in self.nodes.values_mut() {
            node.clear_all();
        }
        self.roa.clear();
        self.last_legitimate_announce = None;
        self.last_hijack_announce = None;
        self.hijack_checked = false;
        self.hijacked_asns.clear();
        self.vantage_points_hijacked.clear();
        self.policy_violations.clear();
        self.rov_asns.clear();
    }

    pub fn as_info(&self, asn: ASN) -> Option<AsInfo> {
        self.nodes.get(&asn).map(|node| AsInfo {
            asn,
            country: node.country.clone(),
            continent: node.continent.clone(),
            degree: node.degree(),
        })
    }

    pub fn all_as_info(&self) -> Vec<AsInfo> {
        self.nodes.keys().filter_map(|asn| self.as_info(*asn)).collect()
    }

    fn relation_stats<'a>(&self, asns: impl IntoIterator<Item = &'a ASN>) -> RelationStats {
        let mut count = 0;
        let mut countries = BTreeSet::new();
        let mut continents = BTreeSet::new();
        for asn in asns {
            count += 1;
            if let Some(node) = self.nodes.get(asn) {
                countries.insert(node.country.as_str());
                continents.insert(node.continent.as_str());
            }
        }
        RelationStats {
            count,
            countries: countries.len(),
            continents: continents.len(),
        }
    }

    pub fn neighbor_stats(&self, asn: ASN) -> Option<NeighborStats> {
        let Some(node) = self.nodes.get(&asn) else {
            log::debug!("AS{} is not in the graph", asn);
            return None;
        };
        let all: BTreeSet<ASN> = node
            .customers
            .iter()
            .chain(&node.peers)
            .chain(&node.providers)
            .copied()
            .collect();

        Some(NeighborStats {
            neighbors: self.relation_stats(&all),
            customers: self.relation_stats(&node.customers),
            peers: self.relation_stats(&node.peers),
            providers: self.relation_stats(&node.providers),
        })
    }

    /// Connected components of the topology, siblings included, largest first.
    pub fn connected_components(&self) -> Vec<BTreeSet<ASN>> {
        let mut unvisited: BTreeSet<ASN> = self.nodes.keys().copied().collect();
        let mut components = Vec::new();

        while let Some(start) = unvisited.pop_first() {
            let mut component = BTreeSet::from([start]);
            let mut stack = vec![start];
            while let Some(asn) = stack.pop() {
                let Some(node) = self.nodes.get(&asn) else {
                    continue;
                };
                for neighbor in node.neighbors() {
                    if unvisited.remove(&neighbor) {
                        component.insert(neighbor);
                        stack.push(neighbor);
                    }
                }
            }
            components.push(component);
        }

        components.sort_by(|a, b| b.len().cmp(&a.len()));
        log::info!("{} connected component(s) in the graph", components.len());
        components
    }

    pub fn topology_stats(&self) -> TopologyStats {
        let mut stats = TopologyStats {
            total: self.nodes.len(),
            ..Default::default()
        };
        for node in self.nodes.values() {
            let (c, p, pr) = (
                !node.customers.is_empty(),
                !node.peers.is_empty(),
                !node.providers.is_empty(),
            );
            match (c, p, pr) {
                (false, true, false) => stats.only_peers += 1,
                (false, false, true) => stats.only_providers += 1,
                (true, false, false) => stats.only_customers += 1,
                _ => {}
            }
        }
        stats
    }
}
