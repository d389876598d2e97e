pub mod caida;
pub mod metadata;

use crate::as_graph::NetworkGraph;
use crate::shared::Result;

pub use caida::{load_relationships, CaidaRelationshipLoader, TIER_2_ASNS};
pub use metadata::{load_roas, MetadataLoader, PrependLoader, VantagePointLoader};

pub trait ASGraphGenerator {
    fn generate(&self) -> Result<NetworkGraph>;
}
