//! pkgdag: a typed DAG evaluation engine for FX memo-logic signals.
//!
//! Market bars and indicator values enter as layer-0 leaves of a directed
//! acyclic graph keyed by structured PKG identifiers
//! (`"{tf}{period}{ccy}^{layer}-{sequence}"`). Function nodes, from
//! arithmetic primitives to domain judgments (dokyaku, ikikaeri,
//! momi/overshoot), derive values layer by layer; the top layer is read
//! out as the trading
//! signal. Evaluation is deterministic and stateless per node: a pass walks
//! a memoized topological order, reuses cache entries inside their validity
//! window, and recovers missing inputs with logged defaults instead of
//! aborting.
//!
//! Entry point: [`SignalEngine`]. Typical cycle:
//! 1. `ingest` raw symbols (prices, bars, flags) as they tick,
//! 2. `register_function` / `import_definitions` to wire derived nodes,
//! 3. `read_signal` the top-layer nodes each decision interval.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod engine;
pub mod functions;
pub mod graph;
pub mod id;
pub mod market;

pub use analysis::CycleError;
pub use compute::{CacheStats, Direction, EvalError, EvalOptions, Signal, Value, ValueCache};
pub use config::{ConfigError, EngineConfig};
pub use engine::{DefinitionRecord, EngineStats, SignalEngine};
pub use functions::{FunctionSpec, JudgmentParams, UnknownFunction};
pub use graph::{BuildError, NodeId, NodeMetadata, PkgGraph};
pub use id::{Currency, IdError, Period, PkgId, Timeframe};
pub use market::{HaBar, OhlcBar};
