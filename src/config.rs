//! Engine configuration.
//!
//! Judgment thresholds are configuration, not algorithm: every pair gets a
//! `JudgmentParams` set, explicitly configured or defaulted from its pip
//! size. Loading is plain JSON; where the records come from (files,
//! spreadsheets, a tuning harness) is a collaborator's concern.

use crate::compute::EvalOptions;
use crate::functions::JudgmentParams;
use crate::id::Currency;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Validity window for cached node results, in milliseconds.
    pub cache_ttl_ms: u64,
    /// Wall-clock budget per evaluation pass, in milliseconds. Absent means
    /// unbounded.
    pub time_budget_ms: Option<u64>,
    /// Evaluate same-layer nodes on the rayon pool.
    pub parallel: bool,
    /// Per-pair judgment thresholds. Pairs not listed fall back to pip
    /// defaults.
    pub judgments: HashMap<Currency, JudgmentParams>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 500,
            time_budget_ms: None,
            parallel: false,
            judgments: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Judgment thresholds for a pair, configured or pip-defaulted.
    pub fn judgments_for(&self, currency: Currency) -> JudgmentParams {
        self.judgments
            .get(&currency)
            .cloned()
            .unwrap_or_else(|| JudgmentParams::for_pip(currency.pip()))
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            time_budget: self.time_budget_ms.map(Duration::from_millis),
            parallel: self.parallel,
        }
    }
}
