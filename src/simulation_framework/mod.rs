pub mod data_tracker;
pub mod hijackers;
pub mod scenario;
pub mod scenario_config;
pub mod simulation;

pub use data_tracker::{DataTracker, TypeSummary};
pub use hijackers::{DegreeCluster, HijackerSelector};
pub use scenario::{
    run_scenario, run_victim, AsProfile, ScenarioOptions, ScenarioReport, ScenarioRequest,
    VictimPlan,
};
pub use scenario_config::{ClusterSelection, SimulationConfig, VictimPrefix};
pub use simulation::Simulation;
