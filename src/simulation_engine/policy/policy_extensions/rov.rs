use crate::prefix::Prefix;
use crate::route_validator::RouteValidator;
use crate::shared::{ROAValidity, ASN};
use crate::simulation_engine::policy::PolicyExtension;

/// Route Origin Validation (ROV) policy
///
/// Strict variant: a prefix without any ROA is dropped just like one whose
/// origin is not authorized.
#[derive(Debug, Clone)]
pub struct ROVPolicy;

impl PolicyExtension for ROVPolicy {
    fn validate_announcement(
        &self,
        prefix: &Prefix,
        as_path: &[ASN],
        receiver: ASN,
        route_validator: &RouteValidator,
    ) -> bool {
        let Some(&origin) = as_path.last() else {
            return false;
        };

        match route_validator.get_validity(prefix, origin) {
            ROAValidity::Valid => true,
            validity => {
                log::debug!(
                    "ROV: AS{} rejects prefix {} originated by AS{} ({})",
                    receiver,
                    prefix,
                    origin,
                    validity
                );
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ROV"
    }
}
