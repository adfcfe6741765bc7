//! The evaluation pass.
//!
//! Walks a topological order, short-circuiting raw leaves and fresh cache
//! entries, resolving inputs, dispatching each function node and caching
//! the result. Single-threaded and synchronous by default; the optional
//! layer-parallel mode fans out same-layer nodes (independent under the
//! strict layer invariant) and writes results back in node order, so
//! outputs never depend on thread timing.

use super::cache::ValueCache;
use super::value::Value;
use crate::analysis::CycleError;
use crate::graph::{GraphRegistry, NodeId, NodeKind};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("evaluation pass exceeded its {budget:?} budget after {elapsed:?}")]
    Timeout { budget: Duration, elapsed: Duration },
    #[error("unknown evaluation target '{id}'")]
    UnknownTarget { id: String },
}

#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Validity window for reusing cached node results.
    pub cache_ttl: Duration,
    /// Wall-clock budget for one pass; `None` means unbounded.
    pub time_budget: Option<Duration>,
    /// Evaluate same-layer nodes on the rayon pool.
    pub parallel: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_millis(500),
            time_budget: None,
            parallel: false,
        }
    }
}

/// What a pass did, for the engine's observability counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub evaluated: u64,
    /// Missing-input substitutions performed (recovered, not errors).
    pub substitutions: u64,
}

/// Runs one pass over `order`. Cache entries written before a timeout abort
/// are individually valid and stay in place.
pub fn run_pass(
    registry: &GraphRegistry,
    order: &[NodeId],
    cache: &mut ValueCache,
    options: &EvalOptions,
) -> Result<PassOutcome, EvalError> {
    let started = Instant::now();
    let outcome = if options.parallel {
        run_layered(registry, order, cache, options, started)?
    } else {
        run_sequential(registry, order, cache, options, started)?
    };
    cache.note_pass(started.elapsed());
    Ok(outcome)
}

fn run_sequential(
    registry: &GraphRegistry,
    order: &[NodeId],
    cache: &mut ValueCache,
    options: &EvalOptions,
    started: Instant,
) -> Result<PassOutcome, EvalError> {
    let mut outcome = PassOutcome::default();

    for &node in order {
        check_budget(options, started)?;
        if let Some((value, missing)) = evaluate_node(registry, cache, node, options) {
            outcome.evaluated += 1;
            outcome.substitutions += missing;
            cache.put(node, value);
        }
    }
    Ok(outcome)
}

fn run_layered(
    registry: &GraphRegistry,
    order: &[NodeId],
    cache: &mut ValueCache,
    options: &EvalOptions,
    started: Instant,
) -> Result<PassOutcome, EvalError> {
    let mut outcome = PassOutcome::default();
    let mut i = 0;

    while i < order.len() {
        check_budget(options, started)?;
        let layer = registry.layer(order[i]);
        let end = order[i..]
            .iter()
            .position(|&n| registry.layer(n) != layer)
            .map_or(order.len(), |p| i + p);

        // Same-layer nodes never depend on each other, so the chunk reads a
        // frozen cache and the writes land sequentially afterwards.
        let shared: &ValueCache = cache;
        let results: Vec<(NodeId, Value, u64)> = order[i..end]
            .par_iter()
            .filter_map(|&node| {
                evaluate_node(registry, shared, node, options).map(|(v, m)| (node, v, m))
            })
            .collect();

        for (node, value, missing) in results {
            outcome.evaluated += 1;
            outcome.substitutions += missing;
            cache.put(node, value);
        }
        i = end;
    }
    Ok(outcome)
}

/// Evaluates one node if it needs work. Returns `None` for raw leaves and
/// fresh cache hits; otherwise the computed value plus how many inputs had
/// to be substituted.
fn evaluate_node(
    registry: &GraphRegistry,
    cache: &ValueCache,
    node: NodeId,
    options: &EvalOptions,
) -> Option<(Value, u64)> {
    let spec = match registry.kind(node) {
        NodeKind::RawData { .. } => return None,
        NodeKind::Function(spec) => spec,
    };
    if cache.get(node, options.cache_ttl).is_some() {
        return None;
    }

    let parents = registry.parents(node);
    let mut inputs: SmallVec<[Option<Value>; 8]> = SmallVec::with_capacity(parents.len());
    let mut missing = 0u64;
    for &parent in parents {
        let resolved = resolve(registry, cache, parent);
        if resolved.is_none() {
            missing += 1;
            tracing::warn!(
                node = %registry.pkg_id(node),
                input = %registry.pkg_id(parent),
                "missing input value; substituting function default"
            );
        }
        inputs.push(resolved);
    }

    Some((spec.evaluate(&inputs), missing))
}

/// A node's current value: raw storage for leaves, cache for functions.
pub fn resolve(registry: &GraphRegistry, cache: &ValueCache, node: NodeId) -> Option<Value> {
    match registry.kind(node) {
        NodeKind::RawData { value } => value.clone(),
        NodeKind::Function(_) => cache.peek(node).cloned(),
    }
}

fn check_budget(options: &EvalOptions, started: Instant) -> Result<(), EvalError> {
    if let Some(budget) = options.time_budget {
        let elapsed = started.elapsed();
        if elapsed > budget {
            return Err(EvalError::Timeout { budget, elapsed });
        }
    }
    Ok(())
}
