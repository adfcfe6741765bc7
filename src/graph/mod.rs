//! The PKG node graph: arena storage, node kinds, and the builder facade.
pub mod dag;
pub mod node;
pub mod registry;

pub use dag::{BuildError, PkgGraph, Registered};
pub use node::{NodeKind, NodeMetadata};
pub use registry::{GraphRegistry, NodeId};
