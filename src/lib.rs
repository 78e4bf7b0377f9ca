//! Place/transition nets with an incrementally built reachability graph and
//! a depth-first coverability check for boundedness.

pub mod analysis;
pub mod config;
pub mod error;
pub mod net;
pub mod options;
pub mod session;

pub use analysis::{BoundnessResult, ReachabilityGraph, UnboundedWitness, check_boundness};
pub use error::{NetError, Result};
pub use net::{Marking, Net, NetDefinition};
pub use session::{AnalysisSummary, NetEvent, Session, Snapshot};
