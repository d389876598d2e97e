use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::prefix::Prefix;
use crate::shared::{Result, ASN};

use super::scenario::ScenarioReport;

pub const RESULT_FILE: &str = "result.csv";
pub const SUMMARY_FILE: &str = "summary.json";

const RESULT_HEADER: [&str; 26] = [
    "Prefix_leg",
    "Leg_ASN",
    "Description_leg",
    "Country_leg",
    "Continent_leg",
    "Customer_leg",
    "Providers_leg",
    "Peers_leg",
    "Degree_leg",
    "ROA",
    "Prefix_hjk",
    "Hijacker",
    "Description_hjk",
    "Country_hjk",
    "Continent_hjk",
    "Customer_hjk",
    "Providers_hjk",
    "Peers_hjk",
    "Degree_hjk",
    "Forged_AS_path",
    "Type",
    "Total_ASes",
    "Contaminated_ASes",
    "VPs_observ_hjk",
    "ROV",
    "Policy_violations",
];

const PATH_HEADER: [&str; 5] = ["Prefix", "AS_path", "Type", "Sequence", "Forced"];

pub fn path_file_name(forged_path_len: usize) -> String {
    format!("result_as-path_type-{}.csv", forged_path_len)
}

fn join_prefixes(prefixes: &BTreeSet<Prefix>) -> String {
    prefixes
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn format_path(path: &[ASN]) -> String {
    let hops: Vec<String> = path.iter().map(|asn| asn.to_string()).collect();
    format!("[{}]", hops.join(", "))
}

/// Aggregates for all scenarios sharing one forged path length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeSummary {
    pub scenarios: usize,
    pub mean_contaminated: f64,
    pub mean_exposure_ratio: f64,
    pub mean_vantage_points: f64,
    pub scenarios_seen_by_vps: usize,
    pub total_policy_violations: usize,
}

/// Collects scenario reports and writes them out as CSV and JSON.
#[derive(Debug, Default)]
pub struct DataTracker {
    pub output_dir: PathBuf,
    pub reports: Vec<ScenarioReport>,
}

impl DataTracker {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        DataTracker {
            output_dir: output_dir.as_ref().to_path_buf(),
            reports: Vec::new(),
        }
    }

    pub fn add_report(&mut self, report: ScenarioReport) {
        self.reports.push(report);
    }

    pub fn extend(&mut self, reports: impl IntoIterator<Item = ScenarioReport>) {
        self.reports.extend(reports);
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Summary keyed by forged path length (`0` for type-0, `1` for type-1).
    pub fn summary(&self) -> BTreeMap<usize, TypeSummary> {
        let mut groups: BTreeMap<usize, Vec<&ScenarioReport>> = BTreeMap::new();
        for report in &self.reports {
            groups.entry(report.forged_path_len()).or_default().push(report);
        }

        groups
            .into_iter()
            .map(|(len, reports)| {
                let n = reports.len() as f64;
                let summary = TypeSummary {
                    scenarios: reports.len(),
                    mean_contaminated: reports.iter().map(|r| r.exposed_ases.len() as f64).sum::<f64>() / n,
                    mean_exposure_ratio: reports.iter().map(|r| r.exposure_ratio()).sum::<f64>() / n,
                    mean_vantage_points: reports.iter().map(|r| r.vantage_points.len() as f64).sum::<f64>() / n,
                    scenarios_seen_by_vps: reports.iter().filter(|r| !r.vantage_points.is_empty()).count(),
                    total_policy_violations: reports.iter().map(|r| r.policy_violations.len()).sum(),
                };
                (len, summary)
            })
            .collect()
    }

    pub fn write_results(&self) -> Result<PathBuf> {
        let path = self.output_dir.join(RESULT_FILE);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_path(&path)?;
        writer.write_record(RESULT_HEADER)?;

        for r in &self.reports {
            let (v, h) = (&r.victim, &r.hijacker);
            writer.write_record(&[
                join_prefixes(&r.legitimate.prefixes),
                v.asn.to_string(),
                v.description.clone(),
                v.country.clone(),
                v.continent.clone(),
                v.customers.to_string(),
                v.providers.to_string(),
                v.peers.to_string(),
                v.degree.to_string(),
                if r.roa { "Y" } else { "N" }.to_string(),
                join_prefixes(&r.hijack.prefixes),
                h.asn.to_string(),
                h.description.clone(),
                h.country.clone(),
                h.continent.clone(),
                h.customers.to_string(),
                h.providers.to_string(),
                h.peers.to_string(),
                h.degree.to_string(),
                format_path(&r.forged_path),
                r.forged_path_len().to_string(),
                r.total_ases.to_string(),
                r.exposed_ases.len().to_string(),
                r.vantage_points.len().to_string(),
                r.rov_count.to_string(),
                r.policy_violations.len().to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// One `Prefix;AS_path;Type;Sequence;Forced` file per forged path length.
    pub fn write_paths(&self) -> Result<Vec<PathBuf>> {
        let mut by_len: BTreeMap<usize, Vec<&ScenarioReport>> = BTreeMap::new();
        for report in &self.reports {
            by_len.entry(report.forged_path_len()).or_default().push(report);
        }

        let mut written = Vec::new();
        for (len, reports) in by_len {
            let path = self.output_dir.join(path_file_name(len));
            let mut writer = csv::WriterBuilder::new()
                .delimiter(b';')
                .from_path(&path)?;
            writer.write_record(PATH_HEADER)?;
            for hijacked in reports.iter().flat_map(|r| &r.hijacked_paths) {
                writer.write_record(&[
                    hijacked.prefix.to_string(),
                    format_path(&hijacked.as_path),
                    hijacked.shape.to_string(),
                    hijacked.sequence(),
                    if hijacked.forced { "Y" } else { "N" }.to_string(),
                ])?;
            }
            writer.flush()?;
            written.push(path);
        }
        Ok(written)
    }

    pub fn write_summary(&self) -> Result<PathBuf> {
        let path = self.output_dir.join(SUMMARY_FILE);
        let data = serde_json::json!({
            "num_scenarios": self.reports.len(),
            "by_forged_path_len": self.summary(),
        });
        fs::write(&path, serde_json::to_string_pretty(&data)?)?;
        Ok(path)
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        self.write_results()?;
        self.write_paths()?;
        self.write_summary()?;
        log::info!("{} scenario(s) written to {:?}", self.reports.len(), self.output_dir);
        Ok(())
    }
}
