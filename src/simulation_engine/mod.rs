pub mod announcement;
pub mod engine;
pub mod path_classifier;
pub mod policy;

pub use announcement::{AnnInfo, AnnouncementRecord, LocalRIB, Route, RouteDecision};
pub use engine::{PropagationOptions, RovSelection, FULL_ROUTE_THRESHOLD};
pub use path_classifier::{HijackedPath, PathClassification};
