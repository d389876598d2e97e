use std::path::PathBuf;

use clap::Parser;

use rovsim::prefix::Prefix;
use rovsim::shared::ForgedPathKind;
use rovsim::simulation_framework::{Simulation, SimulationConfig};
use rovsim::ASN;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// CAIDA serial-2 AS relationship file (plain or .bz2)
    #[arg(long)]
    topology: Option<PathBuf>,

    /// JSON simulation config; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Legitimate origin AS, used together with --prefix
    #[arg(long, requires = "prefix")]
    victim: Option<ASN>,

    #[arg(long, requires = "victim")]
    prefix: Option<Prefix>,

    /// Hijacker AS (repeatable)
    #[arg(long = "hijacker")]
    hijackers: Vec<ASN>,

    /// Only run one forged path kind
    #[arg(long, value_parser = parse_kind)]
    forged_path: Option<ForgedPathKind>,

    /// Do not register a ROA for the victim prefix
    #[arg(long)]
    no_roa: bool,

    #[arg(long, conflicts_with = "rov_asns")]
    rov_percentage: Option<f64>,

    /// Comma-separated list of ASes running ROV
    #[arg(long, value_delimiter = ',')]
    rov_asns: Option<Vec<ASN>>,

    /// Skip the partial-visibility repair after each flood
    #[arg(long)]
    no_repair: bool,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,
}

fn parse_kind(text: &str) -> Result<ForgedPathKind, String> {
    match text {
        "0" | "type0" => Ok(ForgedPathKind::Type0),
        "1" | "type1" => Ok(ForgedPathKind::Type1),
        other => Err(format!("unknown forged path kind {:?}, expected type0 or type1", other)),
    }
}

impl Args {
    fn into_config(self) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)?,
            None => SimulationConfig::new(),
        };

        if let Some(path) = self.topology {
            config = config.with_topology(path);
        }
        if let (Some(victim), Some(prefix)) = (self.victim, self.prefix) {
            config.victims.clear();
            config = config.with_victim(victim, prefix);
        }
        if !self.hijackers.is_empty() {
            config = config.with_hijackers(self.hijackers);
        }
        if let Some(kind) = self.forged_path {
            config = config.with_forged_paths(vec![kind]);
        }
        if self.no_roa {
            config = config.with_roa(false);
        }
        if let Some(p) = self.rov_percentage {
            config.rov_asns = None;
            config = config.with_rov_percentage(p);
        }
        if let Some(asns) = self.rov_asns {
            config.rov_percentage = None;
            config = config.with_rov_asns(asns);
        }
        if self.no_repair {
            config = config.with_repair(false);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(dir) = self.output {
            config = config.with_output_dir(dir);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let config = Args::parse().into_config()?;
    let simulation = Simulation::from_config(config)?;
    let tracker = simulation.run()?;

    for (len, summary) in tracker.summary() {
        println!(
            "type-{}: {} scenario(s), {:.1} contaminated ASes on average ({:.2}%), seen by VPs in {}",
            len,
            summary.scenarios,
            summary.mean_contaminated,
            summary.mean_exposure_ratio * 100.0,
            summary.scenarios_seen_by_vps
        );
    }
    Ok(())
}
