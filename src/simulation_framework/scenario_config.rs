use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::prefix::Prefix;
use crate::shared::{ForgedPathKind, Result, UsageError, ASN};
use crate::simulation_engine::{RovSelection, FULL_ROUTE_THRESHOLD};

/// One legitimate origin and the prefix it announces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VictimPrefix {
    pub asn: ASN,
    pub prefix: Prefix,
}

/// Hijackers drawn from degree clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSelection {
    pub clusters: Vec<[usize; 2]>,
    pub hijackers_per_cluster: usize,
}

/// Everything a batch run needs, loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub topology: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub vantage_points: Option<PathBuf>,
    pub prepend: Option<PathBuf>,
    pub victims: Vec<VictimPrefix>,
    pub hijackers: Vec<ASN>,
    pub cluster_selection: Option<ClusterSelection>,
    pub forged_paths: Vec<ForgedPathKind>,
    pub roa_enabled: bool,
    pub rov_percentage: Option<f64>,
    pub rov_asns: Option<Vec<ASN>>,
    pub repair_partial_visibility: bool,
    pub full_route_threshold: u64,
    /// Export the paths of every contaminated AS, not only of vantage points.
    pub export_all_paths: bool,
    pub threads: usize,
    pub output_dir: PathBuf,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let output_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Desktop")
            .join("sims")
            .join("rovsim");

        SimulationConfig {
            topology: None,
            metadata: None,
            vantage_points: None,
            prepend: None,
            victims: Vec::new(),
            hijackers: Vec::new(),
            cluster_selection: None,
            forged_paths: vec![ForgedPathKind::Type0, ForgedPathKind::Type1],
            roa_enabled: true,
            rov_percentage: None,
            rov_asns: None,
            repair_partial_visibility: true,
            full_route_threshold: FULL_ROUTE_THRESHOLD,
            export_all_paths: false,
            threads: num_cpus::get().saturating_sub(1).max(1),
            output_dir,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn with_topology(mut self, path: impl Into<PathBuf>) -> Self {
        self.topology = Some(path.into());
        self
    }

    pub fn with_victim(mut self, asn: ASN, prefix: Prefix) -> Self {
        self.victims.push(VictimPrefix { asn, prefix });
        self
    }

    pub fn with_hijackers(mut self, hijackers: Vec<ASN>) -> Self {
        self.hijackers = hijackers;
        self
    }

    pub fn with_forged_paths(mut self, kinds: Vec<ForgedPathKind>) -> Self {
        self.forged_paths = kinds;
        self
    }

    pub fn with_roa(mut self, enabled: bool) -> Self {
        self.roa_enabled = enabled;
        self
    }

    pub fn with_rov_percentage(mut self, percentage: f64) -> Self {
        self.rov_percentage = Some(percentage);
        self
    }

    pub fn with_rov_asns(mut self, asns: Vec<ASN>) -> Self {
        self.rov_asns = Some(asns);
        self
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair_partial_visibility = repair;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// ROV selection, or `None` when neither mode is configured.
    pub fn rov_selection(&self) -> std::result::Result<Option<RovSelection>, UsageError> {
        let has_percentage = self.rov_percentage.map_or(false, |p| p != 0.0);
        let has_asns = self.rov_asns.as_ref().map_or(false, |list| !list.is_empty());
        if !has_percentage && !has_asns {
            return Ok(None);
        }
        RovSelection::from_parts(self.rov_percentage, self.rov_asns.clone()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{"victims": [{"asn": 10, "prefix": "10.0.0.0/24"}], "rov_percentage": 20.0}"#,
        )
        .unwrap();
        assert_eq!(config.victims[0].prefix.to_string(), "10.0.0.0/24");
        assert_eq!(config.full_route_threshold, FULL_ROUTE_THRESHOLD);
        assert_eq!(config.forged_paths.len(), 2);
        assert_eq!(
            config.rov_selection(),
            Ok(Some(RovSelection::Percentage(20.0)))
        );
    }

    #[test]
    fn test_conflicting_rov_modes() {
        let config = SimulationConfig::new()
            .with_rov_percentage(10.0)
            .with_rov_asns(vec![1]);
        assert_eq!(config.rov_selection(), Err(UsageError::RovSelectionConflict));
    }
}
