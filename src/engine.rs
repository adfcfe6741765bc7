//! The engine facade tying graph, cache and evaluator together.
//!
//! External collaborators see three boundaries: `ingest` (raw market data
//! in), `evaluate`/`read_signal` (node values out), and
//! `import_definitions` (bulk function registration from external
//! definition records). The cache is owned here and torn down with the
//! engine; there is no shared state between engines.

use crate::compute::{self, CacheStats, EvalError, EvalOptions, Value, ValueCache};
use crate::config::EngineConfig;
use crate::functions::FunctionSpec;
use crate::graph::{BuildError, NodeId, NodeMetadata, PkgGraph, Registered};
use crate::id::{Currency, Period, PkgId, Timeframe};
use serde::Deserialize;
use smallvec::SmallVec;
use std::collections::HashMap;

/// One externally supplied function-node definition (e.g. a spreadsheet
/// row, already parsed by the collaborator that owns that format).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefinitionRecord {
    pub name: String,
    pub function_type: String,
    /// Input node ids in wire form; parsed leniently, matching the
    /// half-known identifiers bulk definitions historically carry.
    pub inputs: Vec<String>,
    /// Timeframe digit code; unknown codes default like the lenient parse.
    pub timeframe: u8,
    /// Optional numeric parameter routed to whichever parameter the
    /// function type takes (threshold, default, reference, tick).
    pub threshold: Option<f64>,
    pub group: u32,
}

/// Monotonic engine counters, exposed for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub cache: CacheStats,
    /// Evaluation passes completed.
    pub passes: u64,
    /// Missing-input substitutions across all passes. A persistently
    /// climbing value means some upstream feed is degraded.
    pub substitutions: u64,
}

#[derive(Debug, Default)]
pub struct SignalEngine {
    graph: PkgGraph,
    cache: ValueCache,
    config: EngineConfig,
    options: EvalOptions,
    passes: u64,
    substitutions: u64,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        let options = config.eval_options();
        Self {
            graph: PkgGraph::new(),
            cache: ValueCache::new(),
            config,
            options,
            passes: 0,
            substitutions: 0,
        }
    }

    pub fn graph(&self) -> &PkgGraph {
        &self.graph
    }

    /// Raw-data ingestion boundary: one update tick/bar for a symbol.
    /// Updates cascade-invalidate every dependent's cache entry so the next
    /// pass recomputes them instead of serving stale values.
    pub fn ingest(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        period: Period,
        currency: Currency,
        value: impl Into<Value>,
    ) -> Result<PkgId, BuildError> {
        let registered =
            self.graph
                .register_raw_data(symbol, timeframe, period, currency, value.into())?;
        if let Registered::Updated(node) = registered {
            self.cache.invalidate(self.graph.registry(), node);
        }
        Ok(self.graph.pkg_id(registered.node()).clone())
    }

    pub fn register_function(
        &mut self,
        id: PkgId,
        spec: FunctionSpec,
        inputs: &[PkgId],
        meta: NodeMetadata,
    ) -> Result<NodeId, BuildError> {
        self.graph.register_function(id, spec, inputs, meta)
    }

    /// Bulk-registers function nodes from external definition records.
    ///
    /// Layers are never taken from the records: each node's layer is
    /// derived as one above its highest input, and the node inherits the
    /// currency of its first input. Returns the ids in record order.
    pub fn import_definitions(
        &mut self,
        records: &[DefinitionRecord],
    ) -> Result<Vec<PkgId>, BuildError> {
        let mut registered = Vec::with_capacity(records.len());
        for record in records {
            let inputs: SmallVec<[PkgId; 8]> = record
                .inputs
                .iter()
                .map(|s| PkgId::parse_lenient(s))
                .collect::<Result<_, _>>()?;
            if inputs.is_empty() {
                return Err(BuildError::EmptyInputs { id: record.name.clone() });
            }

            let currency = inputs[0].currency;
            let layer = 1 + inputs.iter().map(|i| i.layer).max().unwrap_or(0);
            let timeframe = Timeframe::from_code(record.timeframe).unwrap_or(Timeframe::M15);
            let spec = FunctionSpec::from_tag(
                &record.function_type,
                record.threshold,
                &self.config.judgments_for(currency),
            )?;
            let id = PkgId::new(timeframe, Period::Common, currency, layer, sequence_token(&record.name))?;
            let meta = NodeMetadata { name: record.name.clone(), group: Some(record.group) };

            self.graph.register_function(id.clone(), spec, &inputs, meta)?;
            registered.push(id);
        }
        Ok(registered)
    }

    /// Runs one evaluation pass and returns node values, filtered to
    /// `targets` when given. Unknown targets fail loudly before the pass.
    pub fn evaluate(
        &mut self,
        targets: Option<&[PkgId]>,
    ) -> Result<HashMap<PkgId, Value>, EvalError> {
        let target_nodes: Option<Vec<NodeId>> = match targets {
            Some(ids) => Some(
                ids.iter()
                    .map(|id| {
                        self.graph
                            .lookup(id)
                            .ok_or_else(|| EvalError::UnknownTarget { id: id.to_string() })
                    })
                    .collect::<Result<_, _>>()?,
            ),
            None => None,
        };

        let order = self.graph.topological_order()?;
        let outcome =
            compute::run_pass(self.graph.registry(), order.as_slice(), &mut self.cache, &self.options)?;
        self.passes += 1;
        self.substitutions += outcome.substitutions;

        let registry = self.graph.registry();
        let nodes: &[NodeId] = match &target_nodes {
            Some(nodes) => nodes.as_slice(),
            None => order.as_slice(),
        };
        let mut values = HashMap::with_capacity(nodes.len());
        for &node in nodes {
            if let Some(value) = compute::evaluator::resolve(registry, &self.cache, node) {
                values.insert(registry.pkg_id(node).clone(), value);
            }
        }
        Ok(values)
    }

    /// Signal read-out boundary: evaluate just the named top-layer nodes.
    pub fn read_signal(&mut self, targets: &[PkgId]) -> Result<HashMap<PkgId, Value>, EvalError> {
        self.evaluate(Some(targets))
    }

    /// Explicit invalidation: one node and its dependents, or everything.
    pub fn invalidate(&mut self, id: Option<&PkgId>) {
        match id.and_then(|id| self.graph.lookup(id)) {
            Some(node) => self.cache.invalidate(self.graph.registry(), node),
            None => self.cache.clear(),
        }
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache: self.cache.stats(),
            passes: self.passes,
            substitutions: self.substitutions,
        }
    }
}

/// Definition names may carry the id separators; strip them for the
/// sequence token.
fn sequence_token(name: &str) -> String {
    let token: String = name
        .chars()
        .map(|c| if c == '^' || c == '-' || c.is_whitespace() { '_' } else { c })
        .collect();
    if token.is_empty() {
        "node".to_string()
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Direction;
    use crate::market::OhlcBar;
    use approx::assert_relative_eq;

    fn id(layer: u8, seq: &str) -> PkgId {
        PkgId::new(Timeframe::M15, Period::Common, Currency::UsdJpy, layer, seq).unwrap()
    }

    fn ingest(engine: &mut SignalEngine, symbol: &str, value: f64) -> PkgId {
        engine
            .ingest(symbol, Timeframe::M15, Period::Common, Currency::UsdJpy, value)
            .unwrap()
    }

    /// The three-layer scenario: two price leaves and a flag leaf, a
    /// subtraction and a rounding node above them, and a select node on top
    /// choosing between the subtraction and the first price.
    fn build_scenario(engine: &mut SignalEngine) -> PkgId {
        ingest(engine, "AA001", 110.50);
        ingest(engine, "AA002", 110.45);
        ingest(engine, "BA001", 0.95);

        engine
            .register_function(
                id(1, "diff"),
                FunctionSpec::Subtract,
                &[id(0, "AA001"), id(0, "AA002")],
                NodeMetadata::named("price_gap"),
            )
            .unwrap();
        engine
            .register_function(
                id(1, "flag"),
                FunctionSpec::Round { tick: 1.0 },
                &[id(0, "BA001")],
                NodeMetadata::named("flag"),
            )
            .unwrap();
        let top = id(2, "signal");
        engine
            .register_function(
                top.clone(),
                FunctionSpec::Select { default: 0.0 },
                &[id(1, "flag"), id(1, "diff"), id(0, "AA001")],
                NodeMetadata::named("signal"),
            )
            .unwrap();
        top
    }

    #[test]
    fn end_to_end_three_layer_scenario() {
        let mut engine = SignalEngine::default();
        let top = build_scenario(&mut engine);

        let values = engine.read_signal(std::slice::from_ref(&top)).unwrap();
        let out = values[&top].as_scalar().unwrap();
        // flag rounds 0.95 -> 1, selecting option 1: the 0.05 price gap.
        assert_relative_eq!(out, 0.05, epsilon = 1e-9);
    }

    #[test]
    fn repeated_passes_are_deterministic() {
        let mut engine = SignalEngine::default();
        let top = build_scenario(&mut engine);

        let first = engine.evaluate(None).unwrap();
        let second = engine.evaluate(None).unwrap();
        assert_eq!(first, second);
        assert!(first.contains_key(&top));
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn raw_update_cascades_and_recomputes() {
        let mut engine = SignalEngine::default();
        let top = build_scenario(&mut engine);
        let before = engine.read_signal(std::slice::from_ref(&top)).unwrap();
        assert_relative_eq!(before[&top].as_scalar().unwrap(), 0.05, epsilon = 1e-9);

        // New tick for AA001 invalidates diff and the select above it.
        ingest(&mut engine, "AA001", 110.65);
        let after = engine.read_signal(std::slice::from_ref(&top)).unwrap();
        assert_relative_eq!(after[&top].as_scalar().unwrap(), 0.20, epsilon = 1e-9);
    }

    #[test]
    fn unknown_target_fails_loudly() {
        let mut engine = SignalEngine::default();
        build_scenario(&mut engine);
        let missing = id(5, "nope");
        let err = engine.read_signal(std::slice::from_ref(&missing)).unwrap_err();
        assert!(matches!(err, EvalError::UnknownTarget { .. }));
    }

    #[test]
    fn substitutions_are_observable() {
        let mut engine = SignalEngine::default();
        ingest(&mut engine, "AA001", 110.50);
        // Second input never receives data: stays a warm-up placeholder.
        engine
            .register_function(
                id(1, "diff"),
                FunctionSpec::Subtract,
                &[id(0, "AA001"), id(0, "AA404")],
                NodeMetadata::default(),
            )
            .unwrap();

        let values = engine.evaluate(None).unwrap();
        assert_relative_eq!(values[&id(1, "diff")].as_scalar().unwrap(), 110.50);
        assert_eq!(engine.stats().substitutions, 1);
        // The placeholder itself has no value and is absent from the map.
        assert!(!values.contains_key(&id(0, "AA404")));
    }

    #[test]
    fn judgment_nodes_consume_bar_leaves() {
        let mut engine = SignalEngine::default();
        let bars = [
            OhlcBar::new(110.00, 110.06, 109.98, 110.05),
            OhlcBar::new(110.05, 110.12, 110.03, 110.10),
            OhlcBar::new(110.10, 110.18, 110.08, 110.16),
        ];
        for (i, bar) in bars.iter().enumerate() {
            engine
                .ingest(&format!("bar{i}"), Timeframe::M15, Period::Common, Currency::UsdJpy, *bar)
                .unwrap();
        }
        let judge = id(1, "dokyaku");
        let params = EngineConfig::default().judgments_for(Currency::UsdJpy);
        engine
            .register_function(
                judge.clone(),
                FunctionSpec::Dokyaku(params.dokyaku),
                &[id(0, "bar0"), id(0, "bar1"), id(0, "bar2")],
                NodeMetadata::named("dokyaku_m15"),
            )
            .unwrap();

        let values = engine.read_signal(std::slice::from_ref(&judge)).unwrap();
        match &values[&judge] {
            Value::Signal(signal) => {
                assert_eq!(signal.direction, Direction::Up);
                assert!(signal.confidence > 0.0);
            }
            other => panic!("expected a signal, got {other:?}"),
        }
    }

    #[test]
    fn import_derives_layers_and_routes_thresholds() {
        let mut engine = SignalEngine::default();
        ingest(&mut engine, "AA001", 45.2);
        ingest(&mut engine, "AA002", 52.8);
        ingest(&mut engine, "AA003", 48.1);

        let records = vec![
            DefinitionRecord {
                name: "strength rank".into(),
                function_type: "Leader".into(),
                inputs: vec!["391^0-AA001".into(), "391^0-AA002".into(), "391^0-AA003".into()],
                timeframe: 3,
                threshold: Some(45.0),
                group: 7,
            },
            DefinitionRecord {
                name: "rank dual".into(),
                function_type: "dual".into(),
                inputs: vec!["391^1-strength_rank".into()],
                timeframe: 3,
                threshold: None,
                group: 7,
            },
        ];
        let ids = engine.import_definitions(&records).unwrap();
        assert_eq!(ids[0], id(1, "strength_rank"));
        assert_eq!(ids[1], id(2, "rank_dual"));

        let node = engine.graph().lookup(&ids[0]).unwrap();
        assert_eq!(engine.graph().meta(node).group, Some(7));

        let values = engine.evaluate(None).unwrap();
        assert_relative_eq!(values[&ids[0]].as_scalar().unwrap(), 2.0);
        assert_eq!(values[&ids[1]], Value::Split { up: 2.0, down: 0.0 });
    }

    #[test]
    fn import_rejects_unknown_function_types() {
        let mut engine = SignalEngine::default();
        ingest(&mut engine, "AA001", 1.0);
        let record = DefinitionRecord {
            name: "bad".into(),
            function_type: "warp".into(),
            inputs: vec!["391^0-AA001".into()],
            timeframe: 3,
            threshold: None,
            group: 1,
        };
        let err = engine.import_definitions(&[record]).unwrap_err();
        assert!(matches!(err, BuildError::UnknownFunction(_)));
    }

    #[test]
    fn definition_records_deserialize() {
        let json = r#"{
            "name": "gap",
            "function_type": "minus",
            "inputs": ["391^0-AA001", "391^0-AA002"],
            "timeframe": 3,
            "threshold": null,
            "group": 2
        }"#;
        let record: DefinitionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.function_type, "minus");
        assert_eq!(record.inputs.len(), 2);
    }
}
