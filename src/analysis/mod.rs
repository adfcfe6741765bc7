//! Graph algorithms: ordering and reachability.
pub mod topology;

pub use topology::{downstream_from, sort, upstream_from, CycleError};
