//! Node kinds and metadata for the PKG graph.
//!
//! A node is the skeleton of the signal model: it defines what a vertex is
//! and how it relates to its inputs, but computed values live in the
//! `compute::ValueCache`, not here.

use crate::compute::Value;
use crate::functions::FunctionSpec;

/// The two vertex species of the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A layer-0 leaf holding an externally supplied market value.
    ///
    /// `value: None` is the warm-up state: the node was referenced (or
    /// registered ahead of data) but no tick has arrived yet. Consumers
    /// see it as a missing input and substitute their defaults.
    RawData { value: Option<Value> },
    /// A computed vertex. The spec carries the function tag and its typed
    /// parameters; input order is significant and lives in the registry's
    /// parent table.
    Function(FunctionSpec),
}

impl NodeKind {
    pub fn is_raw(&self) -> bool {
        matches!(self, NodeKind::RawData { .. })
    }

    /// Raw nodes count as evaluated the moment a value is present.
    pub fn raw_value(&self) -> Option<&Value> {
        match self {
            NodeKind::RawData { value } => value.as_ref(),
            NodeKind::Function(_) => None,
        }
    }
}

/// Display/audit metadata. Not used as a key; the `PkgId` is the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMetadata {
    /// Human-readable name (e.g. an imported definition's name).
    pub name: String,
    /// Grouping number carried through from imported definitions.
    pub group: Option<u32>,
}

impl NodeMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), group: None }
    }
}
