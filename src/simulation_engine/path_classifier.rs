use serde::{Deserialize, Serialize};

use crate::as_graph::NetworkGraph;
use crate::prefix::Prefix;
use crate::shared::{HopDirection, PathShape, ASN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathClassification {
    pub shape: PathShape,
    /// One entry per hop, in path order (observer side first).
    pub hops: Vec<HopDirection>,
}

/// A hijacked route held by some AS, with its valley-free classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HijackedPath {
    pub asn: ASN,
    pub prefix: Prefix,
    pub as_path: Vec<ASN>,
    pub shape: PathShape,
    pub hops: Vec<HopDirection>,
    /// The route was installed by the partial-visibility repair.
    #[serde(default)]
    pub forced: bool,
}

impl HijackedPath {
    /// Hop codes as written in path exports, e.g. `[1, 0, -1]`.
    pub fn sequence(&self) -> String {
        let codes: Vec<String> = self.hops.iter().map(|hop| hop.code().to_string()).collect();
        format!("[{}]", codes.join(", "))
    }
}

fn shape_of(hops_from_origin: &[HopDirection]) -> PathShape {
    let (mut up, mut peer, mut down) = (false, false, false);
    let mut violation = false;

    for hop in hops_from_origin {
        match hop {
            HopDirection::Up => {
                up = true;
                violation |= peer || down;
            }
            HopDirection::Peer => {
                peer = true;
                violation |= down;
            }
            HopDirection::Down => down = true,
            HopDirection::Unknown => {}
        }
    }

    if violation {
        return PathShape::ValleyViolation;
    }
    match (up, peer, down) {
        (true, false, false) => PathShape::Up,
        (true, true, false) => PathShape::UpPeer,
        (true, false, true) => PathShape::UpDown,
        (true, true, true) => PathShape::UpPeerDown,
        (false, true, false) => PathShape::Peer,
        (false, true, true) => PathShape::PeerDown,
        (false, false, true) => PathShape::Down,
        (false, false, false) => PathShape::Unknown,
    }
}

impl NetworkGraph {
    /// Classifies `as_path` (observer first, origin last) by the
    /// relationships between consecutive ASes. Prepended duplicates count
    /// as one hop.
    pub fn classify_path(&self, as_path: &[ASN]) -> PathClassification {
        let mut collapsed: Vec<ASN> = as_path.to_vec();
        collapsed.dedup();

        let mut hops = Vec::with_capacity(collapsed.len().saturating_sub(1));
        for pair in collapsed.windows(2).rev() {
            let (receiver, sender) = (pair[0], pair[1]);
            let direction = match self.nodes.get(&sender) {
                Some(node) if node.peers.contains(&receiver) => HopDirection::Peer,
                Some(node) if node.providers.contains(&receiver) => HopDirection::Up,
                Some(node) if node.customers.contains(&receiver) => HopDirection::Down,
                _ => HopDirection::Unknown,
            };
            hops.push(direction);
        }

        let shape = shape_of(&hops);
        hops.reverse();
        PathClassification { shape, hops }
    }

    /// Every hijacked route held by `asns`, classified.
    pub fn export_hijacked_paths<'a>(
        &self,
        asns: impl IntoIterator<Item = &'a ASN>,
    ) -> Vec<HijackedPath> {
        let mut result = Vec::new();
        for asn in asns {
            let Some(node) = self.nodes.get(asn) else {
                continue;
            };
            for (prefix, route) in node.hijacked_routes() {
                let PathClassification { shape, hops } = self.classify_path(&route.as_path);
                result.push(HijackedPath {
                    asn: *asn,
                    prefix,
                    as_path: route.as_path.clone(),
                    shape,
                    hops,
                    forced: route.forced,
                });
            }
        }
        result
    }
}
