//! Per-node result cache with a time-based validity window.
//!
//! Dense `Vec<Option<CacheEntry>>` slots indexed by `NodeId`, mirroring the
//! node arena. The cache is explicitly owned by the engine and torn down
//! with it; hit/miss counters are atomics so read-only lookups from a
//! layer-parallel pass stay safe without a lock.

use super::value::Value;
use crate::analysis::downstream_from;
use crate::graph::{GraphRegistry, NodeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Value,
    pub stamp: Instant,
}

/// Observability snapshot. Counters are monotonic over the cache lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub last_pass: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct ValueCache {
    entries: Vec<Option<CacheEntry>>,
    /// The `is_evaluated` latch: set on every put, cleared by invalidation
    /// (not by TTL expiry, which only gates reuse).
    evaluated: Vec<bool>,
    hits: AtomicU64,
    misses: AtomicU64,
    last_pass: Option<Duration>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_capacity(&mut self, len: usize) {
        if self.entries.len() < len {
            self.entries.resize(len, None);
            self.evaluated.resize(len, false);
        }
    }

    /// Returns the cached value if it is younger than `max_age`.
    pub fn get(&self, node: NodeId, max_age: Duration) -> Option<&Value> {
        match self.entries.get(node.index()).and_then(Option::as_ref) {
            Some(entry) if entry.stamp.elapsed() < max_age => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(&entry.value)
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Reads a cached value without TTL or counter effects. Input
    /// resolution inside a pass uses this: entries written earlier in the
    /// same pass are fresh by construction.
    pub fn peek(&self, node: NodeId) -> Option<&Value> {
        self.entries.get(node.index()).and_then(Option::as_ref).map(|e| &e.value)
    }

    pub fn put(&mut self, node: NodeId, value: Value) {
        self.ensure_capacity(node.index() + 1);
        self.entries[node.index()] = Some(CacheEntry { value, stamp: Instant::now() });
        self.evaluated[node.index()] = true;
    }

    pub fn is_evaluated(&self, node: NodeId) -> bool {
        self.evaluated.get(node.index()).copied().unwrap_or(false)
    }

    /// Clears one node's entry and, transitively, every dependent's.
    pub fn invalidate(&mut self, registry: &GraphRegistry, node: NodeId) {
        let affected = downstream_from(registry, &[node]);
        tracing::debug!(start = %registry.pkg_id(node), count = affected.len(), "cache cascade invalidation");
        for id in affected {
            if let Some(slot) = self.entries.get_mut(id.index()) {
                *slot = None;
            }
            if let Some(flag) = self.evaluated.get_mut(id.index()) {
                *flag = false;
            }
        }
    }

    /// Clears every entry.
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|slot| *slot = None);
        self.evaluated.iter_mut().for_each(|flag| *flag = false);
    }

    pub fn note_pass(&mut self, elapsed: Duration) {
        self.last_pass = Some(elapsed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            last_pass: self.last_pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Value;
    use crate::functions::FunctionSpec;
    use crate::graph::{NodeKind, NodeMetadata};
    use crate::id::{Currency, Period, PkgId, Timeframe};
    use std::thread::sleep;

    fn id(layer: u8, seq: &str) -> PkgId {
        PkgId::new(Timeframe::M1, Period::Common, Currency::EurUsd, layer, seq).unwrap()
    }

    fn chain() -> (GraphRegistry, NodeId, NodeId, NodeId, NodeId) {
        // a -> b -> c, with x unrelated.
        let mut reg = GraphRegistry::new();
        let a = reg.push_node(id(0, "a"), NodeKind::RawData { value: None }, &[], NodeMetadata::default());
        let b = reg.push_node(id(1, "b"), NodeKind::Function(FunctionSpec::Sum), &[a], NodeMetadata::default());
        let c = reg.push_node(id(2, "c"), NodeKind::Function(FunctionSpec::Sum), &[b], NodeMetadata::default());
        let x = reg.push_node(id(0, "x"), NodeKind::RawData { value: None }, &[], NodeMetadata::default());
        (reg, a, b, c, x)
    }

    #[test]
    fn ttl_gates_reuse() {
        let (_, a, ..) = chain();
        let mut cache = ValueCache::new();
        cache.put(a, Value::Scalar(1.0));

        assert!(cache.get(a, Duration::from_secs(60)).is_some());
        sleep(Duration::from_millis(5));
        assert!(cache.get(a, Duration::from_millis(1)).is_none());
        // The latch survives TTL expiry; only invalidation clears it.
        assert!(cache.is_evaluated(a));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn cascade_clears_transitive_dependents_only() {
        let (reg, a, b, c, x) = chain();
        let mut cache = ValueCache::new();
        for n in [a, b, c, x] {
            cache.put(n, Value::Scalar(1.0));
        }

        cache.invalidate(&reg, a);
        assert!(cache.peek(a).is_none());
        assert!(cache.peek(b).is_none());
        assert!(cache.peek(c).is_none());
        assert!(cache.peek(x).is_some(), "unrelated entry must survive");
        assert!(!cache.is_evaluated(b));
    }

    #[test]
    fn clear_wipes_everything() {
        let (_, a, b, ..) = chain();
        let mut cache = ValueCache::new();
        cache.put(a, Value::Scalar(1.0));
        cache.put(b, Value::Scalar(2.0));
        cache.clear();
        assert!(cache.peek(a).is_none());
        assert!(cache.peek(b).is_none());
    }
}
