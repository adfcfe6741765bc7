//! Topological ordering of the PKG graph.
//!
//! Kahn's algorithm with a deterministic ready set: nodes become eligible
//! when their in-degree reaches zero and are drained in ascending
//! (layer, NodeId) order. With the strict layer invariant in force this
//! also makes the emitted order non-decreasing in layer, which is what the
//! layer-parallel evaluator chunks on.

use crate::graph::{GraphRegistry, NodeId};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use thiserror::Error;

/// How many residual nodes a cycle report names before truncating.
const CYCLE_REPORT_CAP: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cycle detected; unplaceable nodes: {}", members.join(", "))]
pub struct CycleError {
    /// PkgId strings of nodes left with unresolved inputs (capped).
    pub members: Vec<String>,
}

/// Computes a full topological order over the registry.
pub fn sort(registry: &GraphRegistry) -> Result<Vec<NodeId>, CycleError> {
    let count = registry.count();
    let mut in_degree = vec![0u32; count];
    let mut ready = BinaryHeap::with_capacity(count);
    let mut order = Vec::with_capacity(count);

    for i in 0..count {
        let node = NodeId::new(i);
        in_degree[i] = registry.parents(node).len() as u32;
        if in_degree[i] == 0 {
            ready.push(Reverse((registry.layer(node), node)));
        }
    }

    while let Some(Reverse((_, node))) = ready.pop() {
        order.push(node);
        for child in registry.children(node) {
            let idx = child.index();
            in_degree[idx] -= 1;
            if in_degree[idx] == 0 {
                ready.push(Reverse((registry.layer(child), child)));
            }
        }
    }

    if order.len() != count {
        let members = (0..count)
            .filter(|&i| in_degree[i] > 0)
            .take(CYCLE_REPORT_CAP)
            .map(|i| registry.pkg_id(NodeId::new(i)).to_string())
            .collect();
        return Err(CycleError { members });
    }

    Ok(order)
}

/// All nodes reachable downstream of `start`, including `start` itself.
/// Drives cascade cache invalidation after a raw-data update.
pub fn downstream_from(registry: &GraphRegistry, start: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(registry.children(node));
        }
    }
    visited
}

/// All nodes reachable upstream of `start`, including `start` itself.
pub fn upstream_from(registry: &GraphRegistry, start: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(registry.parents(node).iter().copied());
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Value;
    use crate::functions::FunctionSpec;
    use crate::graph::{NodeKind, NodeMetadata};
    use crate::id::{Currency, Period, PkgId, Timeframe};

    fn id(layer: u8, seq: &str) -> PkgId {
        PkgId::new(Timeframe::M15, Period::Common, Currency::UsdJpy, layer, seq).unwrap()
    }

    fn raw(reg: &mut GraphRegistry, seq: &str) -> NodeId {
        reg.push_node(
            id(0, seq),
            NodeKind::RawData { value: Some(Value::Scalar(0.0)) },
            &[],
            NodeMetadata::default(),
        )
    }

    fn func(reg: &mut GraphRegistry, layer: u8, seq: &str, parents: &[NodeId]) -> NodeId {
        reg.push_node(
            id(layer, seq),
            NodeKind::Function(FunctionSpec::Sum),
            parents,
            NodeMetadata::default(),
        )
    }

    #[test]
    fn diamond_orders_inputs_before_consumers() {
        let mut reg = GraphRegistry::new();
        let a = raw(&mut reg, "a");
        let b = func(&mut reg, 1, "b", &[a]);
        let c = func(&mut reg, 1, "c", &[a]);
        let d = func(&mut reg, 2, "d", &[b, c]);

        let order = sort(&reg).expect("sort failed");
        let pos = |n: NodeId| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));
    }

    #[test]
    fn order_is_deterministic_and_layer_grouped() {
        let mut reg = GraphRegistry::new();
        let a = raw(&mut reg, "a");
        let b = raw(&mut reg, "b");
        let f1 = func(&mut reg, 1, "f1", &[a, b]);
        let f2 = func(&mut reg, 1, "f2", &[b]);
        let top = func(&mut reg, 2, "top", &[f1, f2]);

        let first = sort(&reg).unwrap();
        let second = sort(&reg).unwrap();
        assert_eq!(first, second);

        let layers: Vec<u8> = first.iter().map(|&n| reg.layer(n)).collect();
        let mut sorted = layers.clone();
        sorted.sort_unstable();
        assert_eq!(layers, sorted, "order must be non-decreasing in layer");
        assert_eq!(*first.last().unwrap(), top);
    }

    #[test]
    fn cycle_reports_member_ids() {
        let mut reg = GraphRegistry::new();
        // a and b reference each other: register a as a placeholder, wire b
        // to it, then upgrade a to depend on b.
        let a = reg.push_node(id(1, "a"), NodeKind::RawData { value: None }, &[], NodeMetadata::default());
        let b = func(&mut reg, 2, "b", &[a]);
        reg.replace_node(a, NodeKind::Function(FunctionSpec::Sum), &[b], NodeMetadata::default());

        let err = sort(&reg).unwrap_err();
        assert!(!err.members.is_empty());
        assert!(err.to_string().contains("391^1-a") || err.to_string().contains("391^2-b"));
    }

    #[test]
    fn downstream_closure_includes_transitive_dependents() {
        let mut reg = GraphRegistry::new();
        let a = raw(&mut reg, "a");
        let b = func(&mut reg, 1, "b", &[a]);
        let c = func(&mut reg, 2, "c", &[b]);
        let unrelated = raw(&mut reg, "x");

        let down = downstream_from(&reg, &[a]);
        assert!(down.contains(&a) && down.contains(&b) && down.contains(&c));
        assert!(!down.contains(&unrelated));

        let up = upstream_from(&reg, &[c]);
        assert!(up.contains(&a) && up.contains(&b));
    }
}
