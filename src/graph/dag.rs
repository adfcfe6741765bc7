//! High-level graph facade over the node arena.
//!
//! Owns registration (with the strict layer invariant), placeholder
//! materialization for not-yet-registered inputs, and the memoized
//! topological order.

use super::node::{NodeKind, NodeMetadata};
use super::registry::{GraphRegistry, NodeId};
use crate::analysis::{self, CycleError};
use crate::compute::Value;
use crate::functions::{FunctionSpec, UnknownFunction};
use crate::id::{Currency, IdError, Period, PkgId, Timeframe};
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    UnknownFunction(#[from] UnknownFunction),
    #[error("function node '{id}' must list at least one input")]
    EmptyInputs { id: String },
    #[error("function node '{id}' cannot live at layer 0 (reserved for raw data)")]
    FunctionAtLayerZero { id: String },
    #[error("layer conflict: '{id}' must sit above input '{input}' (layer {input_layer})")]
    LayerConflict { id: String, input: String, input_layer: u8 },
    #[error("node '{id}' is already registered as a function")]
    AlreadyFunction { id: String },
}

/// Whether an ingest call created a node or updated an existing one. The
/// caller cascades cache invalidation on updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registered {
    Created(NodeId),
    Updated(NodeId),
}

impl Registered {
    pub fn node(self) -> NodeId {
        match self {
            Registered::Created(n) | Registered::Updated(n) => n,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PkgGraph {
    store: GraphRegistry,
    /// Memoized topological order; dropped on any structural change.
    cached_order: Option<Arc<Vec<NodeId>>>,
}

impl PkgGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.store.count()
    }

    pub fn registry(&self) -> &GraphRegistry {
        &self.store
    }

    pub fn lookup(&self, id: &PkgId) -> Option<NodeId> {
        self.store.lookup(id)
    }

    pub fn pkg_id(&self, node: NodeId) -> &PkgId {
        self.store.pkg_id(node)
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        self.store.kind(node)
    }

    pub fn meta(&self, node: NodeId) -> &NodeMetadata {
        self.store.meta(node)
    }

    pub fn parents(&self, node: NodeId) -> &[NodeId] {
        self.store.parents(node)
    }

    /// Registers (or updates) a raw-data leaf keyed
    /// `{tf}{period}{ccy}^0-{symbol}`. An update leaves the topology (and
    /// therefore the memoized order) untouched.
    pub fn register_raw_data(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        period: Period,
        currency: Currency,
        value: Value,
    ) -> Result<Registered, BuildError> {
        let id = PkgId::raw(timeframe, period, currency, symbol)?;
        if let Some(node) = self.store.lookup(&id) {
            if !self.store.set_raw_value(node, value) {
                return Err(BuildError::AlreadyFunction { id: id.to_string() });
            }
            return Ok(Registered::Updated(node));
        }
        let node = self.store.push_node(
            id,
            NodeKind::RawData { value: Some(value) },
            &[],
            NodeMetadata::named(symbol),
        );
        self.cached_order = None;
        Ok(Registered::Created(node))
    }

    /// Registers a function node.
    ///
    /// Inputs that are not registered yet are materialized as valueless
    /// placeholders under their own ids (the warm-up state); registering
    /// the real node later upgrades the placeholder in place. The layer
    /// invariant is strict: the new node's layer must exceed every input's.
    pub fn register_function(
        &mut self,
        id: PkgId,
        spec: FunctionSpec,
        inputs: &[PkgId],
        meta: NodeMetadata,
    ) -> Result<NodeId, BuildError> {
        if id.layer == 0 {
            return Err(BuildError::FunctionAtLayerZero { id: id.to_string() });
        }
        if inputs.is_empty() {
            return Err(BuildError::EmptyInputs { id: id.to_string() });
        }
        for input in inputs {
            if input.layer >= id.layer {
                return Err(BuildError::LayerConflict {
                    id: id.to_string(),
                    input: input.to_string(),
                    input_layer: input.layer,
                });
            }
        }

        let parents: SmallVec<[NodeId; 8]> =
            inputs.iter().map(|input| self.ensure_node(input)).collect();

        let node = match self.store.lookup(&id) {
            Some(existing) => {
                if !self.store.kind(existing).is_raw() {
                    return Err(BuildError::AlreadyFunction { id: id.to_string() });
                }
                // Placeholder upgrade. Dependents registered against this id
                // already proved their layers exceed ours, so no re-check.
                tracing::debug!(id = %id, "upgrading placeholder to function node");
                self.store.replace_node(existing, NodeKind::Function(spec), &parents, meta);
                existing
            }
            None => self.store.push_node(id, NodeKind::Function(spec), &parents, meta),
        };
        self.cached_order = None;
        Ok(node)
    }

    /// Looks up an input id, materializing a placeholder when absent.
    fn ensure_node(&mut self, id: &PkgId) -> NodeId {
        if let Some(node) = self.store.lookup(id) {
            return node;
        }
        self.cached_order = None;
        self.store.push_node(
            id.clone(),
            NodeKind::RawData { value: None },
            &[],
            NodeMetadata::default(),
        )
    }

    /// The memoized topological order, rebuilt after structural changes.
    pub fn topological_order(&mut self) -> Result<Arc<Vec<NodeId>>, CycleError> {
        if let Some(order) = &self.cached_order {
            return Ok(Arc::clone(order));
        }
        let order = Arc::new(analysis::sort(&self.store)?);
        self.cached_order = Some(Arc::clone(&order));
        Ok(order)
    }

}
