use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::as_graph::{AsInfo, NetworkGraph};
use crate::shared::{UsageError, ASN};

/// ASes whose degree falls in `[min, max]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeCluster {
    pub min: usize,
    pub max: usize,
    pub members: Vec<AsInfo>,
}

/// Picks hijacker ASes from a graph, by degree cluster or geography.
pub struct HijackerSelector {
    infos: Vec<AsInfo>,
    clusters: Vec<DegreeCluster>,
    rng: StdRng,
}

impl HijackerSelector {
    pub fn new(graph: &NetworkGraph) -> Self {
        HijackerSelector {
            infos: graph.all_as_info(),
            clusters: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn clusters(&self) -> &[DegreeCluster] {
        &self.clusters
    }

    /// Groups ASes by degree. Ranges must be increasing and disjoint; the
    /// last one may be `[min, 0]`, meaning "from `min` up to the highest degree".
    pub fn create_clusters(&mut self, ranges: &[[usize; 2]]) -> Result<usize, UsageError> {
        let max_degree = self.infos.iter().map(|info| info.degree).max().unwrap_or(0);
        let mut bounds = Vec::with_capacity(ranges.len());
        let mut previous_max = 0;

        for (idx, &[min, max]) in ranges.iter().enumerate() {
            let is_last = idx + 1 == ranges.len();
            if min > max {
                if !is_last || max != 0 {
                    return Err(UsageError::InvalidClusterRanges(format!(
                        "[{}, {}] is reversed",
                        min, max
                    )));
                }
                bounds.push((min, max_degree));
            } else if min <= previous_max {
                return Err(UsageError::InvalidClusterRanges(format!(
                    "[{}, {}] overlaps or precedes the previous range",
                    min, max
                )));
            } else {
                bounds.push((min, max));
                previous_max = max;
            }
        }

        self.clusters = bounds
            .into_iter()
            .map(|(min, max)| DegreeCluster {
                min,
                max,
                members: self
                    .infos
                    .iter()
                    .filter(|info| info.degree >= min && info.degree <= max)
                    .cloned()
                    .collect(),
            })
            .collect();

        for (idx, cluster) in self.clusters.iter().enumerate() {
            log::info!(
                "Cluster {} (degree {}..={}) has {} ASes",
                idx,
                cluster.min,
                cluster.max,
                cluster.members.len()
            );
        }
        Ok(self.clusters.len())
    }

    fn sample(&mut self, candidates: Vec<ASN>, n: usize) -> Vec<ASN> {
        if candidates.len() < n {
            log::warn!(
                "Only {} candidate hijacker(s) available, {} requested",
                candidates.len(),
                n
            );
            return candidates;
        }
        candidates.choose_multiple(&mut self.rng, n).copied().collect()
    }

    fn per_cluster<F>(&mut self, n: usize, keep: F) -> Vec<ASN>
    where
        F: Fn(&AsInfo) -> bool,
    {
        let pools: Vec<Vec<ASN>> = self
            .clusters
            .iter()
            .map(|cluster| {
                cluster
                    .members
                    .iter()
                    .filter(|info| keep(info))
                    .map(|info| info.asn)
                    .collect()
            })
            .collect();

        pools
            .into_iter()
            .flat_map(|pool| self.sample(pool, n))
            .collect()
    }

    fn victim_info(&self, victim: ASN) -> Option<AsInfo> {
        self.infos.iter().find(|info| info.asn == victim).cloned()
    }

    /// `n` hijackers per cluster, never picking an AS from `exclude`.
    pub fn by_clusters(&mut self, n: usize, exclude: &[ASN]) -> Vec<ASN> {
        self.per_cluster(n, |info| !exclude.contains(&info.asn))
    }

    pub fn same_continent(&mut self, victim: ASN, n: usize) -> Vec<ASN> {
        let continent = self.victim_info(victim).map(|v| v.continent).unwrap_or_default();
        self.per_cluster(n, |info| info.asn != victim && info.continent == continent)
    }

    pub fn other_continents(&mut self, victim: ASN, n: usize) -> Vec<ASN> {
        let continent = self.victim_info(victim).map(|v| v.continent).unwrap_or_default();
        self.per_cluster(n, |info| info.asn != victim && info.continent != continent)
    }

    pub fn same_country(&mut self, victim: ASN, n: usize) -> Vec<ASN> {
        let country = self.victim_info(victim).map(|v| v.country).unwrap_or_default();
        self.per_cluster(n, |info| info.asn != victim && info.country == country)
    }

    pub fn other_countries(&mut self, victim: ASN, n: usize) -> Vec<ASN> {
        let country = self.victim_info(victim).map(|v| v.country).unwrap_or_default();
        self.per_cluster(n, |info| info.asn != victim && info.country != country)
    }

    /// `n` hijackers registered in `country` (ISO 3166 alpha-2, any case).
    pub fn by_country(&mut self, victim: ASN, n: usize, country: &str) -> Vec<ASN> {
        let candidates: Vec<ASN> = self
            .infos
            .iter()
            .filter(|info| info.asn != victim && info.country.eq_ignore_ascii_case(country))
            .map(|info| info.asn)
            .collect();
        if candidates.is_empty() {
            log::warn!("No AS found in country {:?}", country);
        }
        self.sample(candidates, n)
    }

    pub fn by_continent(&mut self, victim: ASN, n: usize, continent: &str) -> Vec<ASN> {
        let candidates: Vec<ASN> = self
            .infos
            .iter()
            .filter(|info| info.asn != victim && info.continent.eq_ignore_ascii_case(continent))
            .map(|info| info.asn)
            .collect();
        if candidates.is_empty() {
            log::warn!("No AS found in continent {:?}", continent);
        }
        self.sample(candidates, n)
    }

    pub fn any(&mut self, victim: ASN, n: usize) -> Vec<ASN> {
        let candidates: Vec<ASN> = self
            .infos
            .iter()
            .map(|info| info.asn)
            .filter(|asn| *asn != victim)
            .collect();
        self.sample(candidates, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star_graph() -> NetworkGraph {
        // 1 has five customers, 2..=6 each have one provider; 7 and 8 peer.
        let mut graph = NetworkGraph::new();
        for customer in 2..=6 {
            graph.add_provider_customer(1, customer);
        }
        graph.add_peering(7, 8);
        graph.add_peering(2, 7);
        graph
    }

    #[test]
    fn test_cluster_ranges() {
        let graph = star_graph();
        let mut selector = HijackerSelector::new(&graph).with_seed(7);
        assert_eq!(selector.create_clusters(&[[1, 1], [2, 0]]), Ok(2));
        assert_eq!(selector.clusters()[1].max, 5);
        assert!(selector.create_clusters(&[[2, 3], [3, 4]]).is_err());
        assert!(selector.create_clusters(&[[5, 0], [6, 7]]).is_err());
    }

    #[test]
    fn test_by_clusters_excludes_victims() {
        let graph = star_graph();
        let mut selector = HijackerSelector::new(&graph).with_seed(7);
        selector.create_clusters(&[[1, 1], [2, 0]]).unwrap();
        let picked = selector.by_clusters(10, &[3, 4]);
        assert!(!picked.contains(&3));
        assert!(!picked.contains(&4));
        // cluster 0: 5, 6, 8; cluster 1: 1, 2, 7
        assert_eq!(picked.len(), 6);
    }
}
