pub mod shared;
pub mod prefix;
pub mod as_graph;
pub mod route_validator;
pub mod simulation_engine;
pub mod as_graph_generators;
pub mod simulation_framework;

// Re-export commonly used types at the crate root
pub use as_graph::{ASNode, NetworkGraph};
pub use prefix::{is_subnet, Prefix, SubnetRelation};
pub use route_validator::{RouteValidator, ROA};
pub use shared::{ForgedPathKind, PathShape, Relationships, SimError, ASN};
pub use simulation_engine::{PropagationOptions, RovSelection};
