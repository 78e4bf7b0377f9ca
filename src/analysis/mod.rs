pub mod boundness;
pub mod reachability;

pub use boundness::{BoundnessResult, CoverabilitySearch, SearchPath, UnboundedWitness, check_boundness};
pub use reachability::{ReachabilityGraph, RecordedEdge, StateGraphStats, fire_and_record};
