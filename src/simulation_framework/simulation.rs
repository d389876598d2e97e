use std::collections::BTreeMap;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::as_graph::NetworkGraph;
use crate::as_graph_generators::{
    ASGraphGenerator, CaidaRelationshipLoader, MetadataLoader, PrependLoader, VantagePointLoader,
};
use crate::shared::{Result, UsageError, ASN};

use super::data_tracker::DataTracker;
use super::hijackers::HijackerSelector;
use super::scenario::{run_victim, ScenarioOptions, VictimPlan};
use super::scenario_config::SimulationConfig;

/// Batch runner: every victim of the config against every hijacker, one
/// worker per victim.
pub struct Simulation {
    pub graph: NetworkGraph,
    pub config: SimulationConfig,
    pub prepend: BTreeMap<ASN, BTreeMap<ASN, usize>>,
}

impl Simulation {
    pub fn new(graph: NetworkGraph, config: SimulationConfig) -> Self {
        Simulation {
            graph,
            config,
            prepend: BTreeMap::new(),
        }
    }

    /// Loads the topology and the optional metadata files named in `config`.
    pub fn from_config(config: SimulationConfig) -> Result<Self> {
        let topology = config
            .topology
            .clone()
            .ok_or(UsageError::MissingInput("topology file"))?;

        let start = Instant::now();
        let mut graph = CaidaRelationshipLoader::new(&topology).generate()?;
        log::info!("Loading the connections took {:.4} seconds", start.elapsed().as_secs_f64());

        if let Some(path) = &config.metadata {
            MetadataLoader::new(path).apply(&mut graph)?;
        }
        if let Some(path) = &config.vantage_points {
            VantagePointLoader::new(path).apply(&mut graph)?;
        }
        let prepend = match &config.prepend {
            Some(path) => PrependLoader::new(path).load()?,
            None => BTreeMap::new(),
        };

        Ok(Simulation {
            graph,
            config,
            prepend,
        })
    }

    pub fn with_prepend(mut self, prepend: BTreeMap<ASN, BTreeMap<ASN, usize>>) -> Self {
        self.prepend = prepend;
        self
    }

    fn options(&self) -> ScenarioOptions {
        ScenarioOptions {
            repair_partial_visibility: self.config.repair_partial_visibility,
            prepend: self.prepend.clone(),
            full_route_threshold: self.config.full_route_threshold,
            export_all_paths: self.config.export_all_paths,
            seed: self.config.seed,
        }
    }

    /// Hijackers from the explicit list, else sampled from degree clusters.
    pub fn hijackers(&self) -> Result<Vec<ASN>> {
        if !self.config.hijackers.is_empty() {
            return Ok(self.config.hijackers.clone());
        }
        let Some(selection) = &self.config.cluster_selection else {
            return Err(UsageError::MissingInput("hijackers or cluster selection").into());
        };

        let mut selector = HijackerSelector::new(&self.graph);
        if let Some(seed) = self.config.seed {
            selector = selector.with_seed(seed);
        }
        selector.create_clusters(&selection.clusters)?;
        let victims: Vec<ASN> = self.config.victims.iter().map(|v| v.asn).collect();
        let hijackers = selector.by_clusters(selection.hijackers_per_cluster, &victims);
        log::info!("{} hijackers selected", hijackers.len());
        Ok(hijackers)
    }

    pub fn plans(&self) -> Result<Vec<VictimPlan>> {
        let hijackers = self.hijackers()?;
        Ok(self
            .config
            .victims
            .iter()
            .map(|v| VictimPlan {
                victim: v.asn,
                prefix: v.prefix,
                roa_enabled: self.config.roa_enabled,
                rov: None,
                hijackers: hijackers.clone(),
                kinds: self.config.forged_paths.clone(),
            })
            .collect())
    }

    /// Runs every plan and writes the results to the output directory.
    pub fn run(&self) -> Result<DataTracker> {
        log::info!("Output directory: {:?}", self.config.output_dir);
        let start = Instant::now();

        // ROV is deployed once, for the whole run.
        let mut base = self.graph.snapshot();
        if let Some(selection) = self.config.rov_selection()? {
            match self.config.seed {
                Some(seed) => base.enable_rov_with_rng(&selection, &mut StdRng::seed_from_u64(seed))?,
                None => base.enable_rov(&selection)?,
            };
        }

        let plans = self.plans()?;
        let options = self.options();

        let pb = ProgressBar::new(plans.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} victims")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads.max(1))
            .build()?;
        let results: Vec<(ASN, Result<_>)> = pool.install(|| {
            plans
                .par_iter()
                .map(|plan| {
                    let result = run_victim(&base, plan, &options);
                    pb.inc(1);
                    (plan.victim, result)
                })
                .collect()
        });
        pb.finish();

        let mut tracker = DataTracker::new(&self.config.output_dir);
        for (victim, result) in results {
            match result {
                Ok(reports) => tracker.extend(reports),
                Err(e) => log::warn!("Victim AS{} skipped: {}", victim, e),
            }
        }
        tracker.save()?;

        log::info!(
            "Simulation of {} scenario(s) complete in {:.2}s",
            tracker.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(tracker)
    }
}
