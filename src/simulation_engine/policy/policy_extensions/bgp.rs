use crate::simulation_engine::policy::PolicyExtension;

/// Plain BGP: every announcement that reaches the decision function is considered.
#[derive(Debug, Clone)]
pub struct BGPPolicy;

impl PolicyExtension for BGPPolicy {
    fn name(&self) -> &'static str {
        "BGP"
    }
}
