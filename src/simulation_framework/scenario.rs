use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::as_graph::NetworkGraph;
use crate::prefix::Prefix;
use crate::shared::{ForgedPathKind, Result, TopologyError, UsageError, ASN};
use crate::simulation_engine::{
    AnnouncementRecord, HijackedPath, PropagationOptions, RovSelection, FULL_ROUTE_THRESHOLD,
};

/// One victim / hijacker / forged path combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRequest {
    pub victim: ASN,
    pub prefix: Prefix,
    pub roa_enabled: bool,
    pub hijacker: ASN,
    pub forged_path: Vec<ASN>,
    pub rov: Option<RovSelection>,
}

impl ScenarioRequest {
    pub fn new(victim: ASN, prefix: Prefix, hijacker: ASN, kind: ForgedPathKind) -> Self {
        ScenarioRequest {
            victim,
            prefix,
            roa_enabled: false,
            hijacker,
            forged_path: kind.forged_path(victim),
            rov: None,
        }
    }

    pub fn with_roa(mut self, enabled: bool) -> Self {
        self.roa_enabled = enabled;
        self
    }

    pub fn with_rov(mut self, rov: RovSelection) -> Self {
        self.rov = Some(rov);
        self
    }
}

/// A victim with every hijacker and forged path kind to try against it.
#[derive(Debug, Clone, PartialEq)]
pub struct VictimPlan {
    pub victim: ASN,
    pub prefix: Prefix,
    pub roa_enabled: bool,
    pub rov: Option<RovSelection>,
    pub hijackers: Vec<ASN>,
    pub kinds: Vec<ForgedPathKind>,
}

/// Knobs shared by every scenario of a run.
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    pub repair_partial_visibility: bool,
    /// Per-origin prepending toward each neighbor.
    pub prepend: BTreeMap<ASN, BTreeMap<ASN, usize>>,
    pub full_route_threshold: u64,
    /// Keep classified paths of every contaminated AS, not only of VPs.
    pub export_all_paths: bool,
    pub seed: Option<u64>,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        ScenarioOptions {
            repair_partial_visibility: true,
            prepend: BTreeMap::new(),
            full_route_threshold: FULL_ROUTE_THRESHOLD,
            export_all_paths: false,
            seed: None,
        }
    }
}

impl ScenarioOptions {
    fn propagation_for(&self, origin: ASN) -> PropagationOptions {
        PropagationOptions::new()
            .with_repair(self.repair_partial_visibility)
            .with_origin_prepend(self.prepend.get(&origin).cloned().unwrap_or_default())
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsProfile {
    pub asn: ASN,
    pub description: String,
    pub country: String,
    pub continent: String,
    pub customers: usize,
    pub providers: usize,
    pub peers: usize,
    pub degree: usize,
}

impl AsProfile {
    fn of(graph: &NetworkGraph, asn: ASN) -> AsProfile {
        match graph.get(&asn) {
            Some(node) => AsProfile {
                asn,
                description: node.description.clone(),
                country: node.country.clone(),
                continent: node.continent.clone(),
                customers: node.customers.len(),
                providers: node.providers.len(),
                peers: node.peers.len(),
                degree: node.degree(),
            },
            None => AsProfile {
                asn,
                ..Default::default()
            },
        }
    }
}

/// Outcome of one scenario, made of plain values only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub legitimate: AnnouncementRecord,
    pub hijack: AnnouncementRecord,
    pub victim: AsProfile,
    pub hijacker: AsProfile,
    pub roa: bool,
    pub forged_path: Vec<ASN>,
    pub total_ases: usize,
    pub exposed_ases: BTreeSet<ASN>,
    pub vantage_points: BTreeSet<ASN>,
    pub rov_count: usize,
    /// ASes that end the scenario holding a route installed by the
    /// partial-visibility repair, from either flood.
    pub policy_violations: BTreeSet<ASN>,
    pub hijacked_paths: Vec<HijackedPath>,
}

impl ScenarioReport {
    pub fn forged_path_len(&self) -> usize {
        self.forged_path.len()
    }

    pub fn exposure_ratio(&self) -> f64 {
        if self.total_ases == 0 {
            return 0.0;
        }
        self.exposed_ases.len() as f64 / self.total_ases as f64
    }
}

/// Snapshot of `base` with ROV applied and the victim prefix propagated.
fn legitimate_phase(
    base: &NetworkGraph,
    victim: ASN,
    prefix: Prefix,
    roa_enabled: bool,
    rov: Option<&RovSelection>,
    options: &ScenarioOptions,
) -> Result<NetworkGraph> {
    let mut graph = base.snapshot();

    if let Some(selection) = rov {
        graph.enable_rov_with_rng(selection, &mut options.rng())?;
    }
    if !graph.originate(victim, prefix, roa_enabled) {
        return Err(TopologyError::UnknownAsn(victim).into());
    }

    let start = Instant::now();
    graph.propagate_with(victim, false, &options.propagation_for(victim));
    log::info!(
        "Route from AS{} propagated in {:.4} seconds",
        victim,
        start.elapsed().as_secs_f64()
    );
    Ok(graph)
}

/// Injects the hijack on a fresh copy of `legitimate` and reports on it.
fn hijack_phase(
    legitimate: &NetworkGraph,
    hijacker: ASN,
    prefix: Prefix,
    forged_path: &[ASN],
    options: &ScenarioOptions,
) -> Result<ScenarioReport> {
    if !legitimate.contains(&hijacker) {
        return Err(TopologyError::UnknownAsn(hijacker).into());
    }

    let mut graph = legitimate.snapshot();
    graph.inject_hijack(hijacker, prefix, forged_path.to_vec());

    let start = Instant::now();
    let propagation = PropagationOptions::new().with_repair(options.repair_partial_visibility);
    graph.propagate_with(hijacker, true, &propagation);
    log::info!(
        "Hijack route from AS{} propagated in {:.4} seconds",
        hijacker,
        start.elapsed().as_secs_f64()
    );

    let exposed = graph.check_hijack_exposure_with(options.full_route_threshold);
    let vantage_points = graph.vantage_points_hijacked.clone();
    let hijacked_paths = if options.export_all_paths {
        graph.export_hijacked_paths(&exposed)
    } else {
        graph.export_hijacked_paths(&vantage_points)
    };

    let legitimate_record = graph.last_legitimate_announce.clone().ok_or(
        UsageError::NoAnnouncement {
            asn: hijacker,
            kind: "legitimate",
        },
    )?;
    let hijack_record = graph
        .last_hijack_announce
        .clone()
        .ok_or(UsageError::NoAnnouncement {
            asn: hijacker,
            kind: "hijacked",
        })?;

    Ok(ScenarioReport {
        victim: AsProfile::of(&graph, legitimate_record.origin),
        hijacker: AsProfile::of(&graph, hijacker),
        legitimate: legitimate_record,
        hijack: hijack_record,
        roa: !graph.roa.is_empty(),
        forged_path: forged_path.to_vec(),
        total_ases: graph.len(),
        exposed_ases: exposed,
        vantage_points,
        rov_count: graph.rov_asns.len(),
        policy_violations: graph.forced_route_holders(),
        hijacked_paths,
    })
}

/// Runs one scenario on copies of `base`; `base` itself is not touched.
pub fn run_scenario(
    base: &NetworkGraph,
    request: &ScenarioRequest,
    options: &ScenarioOptions,
) -> Result<ScenarioReport> {
    let legitimate = legitimate_phase(
        base,
        request.victim,
        request.prefix,
        request.roa_enabled,
        request.rov.as_ref(),
        options,
    )?;
    hijack_phase(
        &legitimate,
        request.hijacker,
        request.prefix,
        &request.forged_path,
        options,
    )
}

/// Propagates the victim prefix once, then runs every hijacker and forged
/// path kind on its own copy. Unknown hijackers are skipped with a warning.
pub fn run_victim(
    base: &NetworkGraph,
    plan: &VictimPlan,
    options: &ScenarioOptions,
) -> Result<Vec<ScenarioReport>> {
    let legitimate = legitimate_phase(
        base,
        plan.victim,
        plan.prefix,
        plan.roa_enabled,
        plan.rov.as_ref(),
        options,
    )?;

    let mut reports = Vec::with_capacity(plan.hijackers.len() * plan.kinds.len());
    for (idx, &hijacker) in plan.hijackers.iter().enumerate() {
        if hijacker == plan.victim {
            log::warn!("AS{} cannot hijack its own prefix, skipped", hijacker);
            continue;
        }
        log::debug!(
            "Victim AS{} - hijacker AS{} ({}/{})",
            plan.victim,
            hijacker,
            idx + 1,
            plan.hijackers.len()
        );
        for kind in &plan.kinds {
            let forged_path = kind.forged_path(plan.victim);
            match hijack_phase(&legitimate, hijacker, plan.prefix, &forged_path, options) {
                Ok(report) => reports.push(report),
                Err(e) => log::warn!("Scenario AS{} vs AS{} skipped: {}", plan.victim, hijacker, e),
            }
        }
    }
    Ok(reports)
}
