//! The closed set of node functions.
//!
//! Every function is a pure mapping from ordered, possibly-absent inputs to
//! a `Value`. Dispatch is a single match over `FunctionSpec`; no string
//! comparison happens on the hot path, tags exist only at the import
//! boundary.

pub mod judgment;
pub mod primitives;

pub use judgment::{DokyakuParams, IkikaeriParams, JudgmentParams, MomiParams};

use crate::compute::Value;
use crate::id::Currency;
use crate::market::OhlcBar;
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown function type '{0}'")]
pub struct UnknownFunction(pub String);

/// A function node's computation, with its typed parameters inline.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionSpec {
    /// numerator / sum(denominator terms)
    Ratio,
    /// Arithmetic sum, absent entries skipped.
    Sum,
    /// Condition (rounded, 1-based) picks an option; else `default`.
    Select { default: f64 },
    /// 1-based index of the maximum entry above `threshold`, else 0.
    LeaderSelect { threshold: f64 },
    /// Splits a signed value into non-negative up/down magnitudes.
    DualDirection,
    /// `abs(value - reference)`.
    AbsoluteDistance { reference: f64 },
    /// `a - b`, absent entries as 0.
    Subtract,
    /// Half-away-from-zero to the nearest multiple of `tick`.
    Round { tick: f64 },
    /// Minute-of-hour from an epoch-seconds input.
    MinuteExtract,
    /// Same/reverse continuation judgment over a bar window.
    Dokyaku(DokyakuParams),
    /// Go/return wave-pattern judgment over a bar window.
    Ikikaeri(IkikaeriParams),
    /// Consolidation vs breakout judgment over a bar window.
    MomiOvershoot(MomiParams),
}

impl FunctionSpec {
    /// A rounding node snapped to the currency's pip.
    pub fn pip_round(currency: Currency) -> Self {
        FunctionSpec::Round { tick: currency.pip() }
    }

    /// Resolves an import-record tag. `threshold` feeds whichever parameter
    /// the function takes; judgment thresholds come from per-currency
    /// configuration instead.
    pub fn from_tag(
        tag: &str,
        threshold: Option<f64>,
        judgments: &JudgmentParams,
    ) -> Result<Self, UnknownFunction> {
        let spec = match tag.to_ascii_lowercase().as_str() {
            "ratio" => FunctionSpec::Ratio,
            "sum" | "osum" => FunctionSpec::Sum,
            "select" => FunctionSpec::Select { default: threshold.unwrap_or(0.0) },
            "leader" | "leader_select" => {
                FunctionSpec::LeaderSelect { threshold: threshold.unwrap_or(0.0) }
            }
            "dual" | "dual_direction" => FunctionSpec::DualDirection,
            "abs" | "absolute_distance" => {
                FunctionSpec::AbsoluteDistance { reference: threshold.unwrap_or(0.0) }
            }
            "minus" | "subtract" => FunctionSpec::Subtract,
            "round" => FunctionSpec::Round { tick: threshold.unwrap_or(1.0) },
            "minute" | "minute_extract" => FunctionSpec::MinuteExtract,
            "dokyaku" => FunctionSpec::Dokyaku(judgments.dokyaku.clone()),
            "ikikaeri" => FunctionSpec::Ikikaeri(judgments.ikikaeri.clone()),
            "momi" | "momi_overshoot" => FunctionSpec::MomiOvershoot(judgments.momi.clone()),
            _ => return Err(UnknownFunction(tag.to_string())),
        };
        Ok(spec)
    }

    /// Evaluates the function over resolved inputs. Absent inputs (`None`)
    /// take each function's documented substitution path; the caller is
    /// responsible for having counted/logged them.
    pub fn evaluate(&self, inputs: &[Option<Value>]) -> Value {
        match self {
            FunctionSpec::Ratio => Value::Scalar(primitives::ratio(&scalars(inputs))),
            FunctionSpec::Sum => Value::Scalar(primitives::sum(&scalars(inputs))),
            FunctionSpec::Select { default } => {
                Value::Scalar(primitives::select(&scalars(inputs), *default))
            }
            FunctionSpec::LeaderSelect { threshold } => {
                Value::Scalar(primitives::leader_select(&scalars(inputs), *threshold))
            }
            FunctionSpec::DualDirection => {
                let (up, down) = primitives::dual_direction(first_scalar(inputs));
                Value::Split { up, down }
            }
            FunctionSpec::AbsoluteDistance { reference } => {
                Value::Scalar(primitives::absolute_distance(first_scalar(inputs), *reference))
            }
            FunctionSpec::Subtract => Value::Scalar(primitives::subtract(&scalars(inputs))),
            FunctionSpec::Round { tick } => {
                Value::Scalar(primitives::round_to_tick(first_scalar(inputs), *tick))
            }
            FunctionSpec::MinuteExtract => {
                Value::Scalar(primitives::minute_extract(first_scalar(inputs)))
            }
            FunctionSpec::Dokyaku(params) => match bar_window(inputs) {
                Some(bars) => Value::Signal(judgment::dokyaku(&bars, params)),
                None => Value::Signal(crate::compute::Signal::neutral()),
            },
            FunctionSpec::Ikikaeri(params) => match bar_window(inputs) {
                Some(bars) => Value::Signal(judgment::ikikaeri(&bars, params)),
                None => Value::Signal(crate::compute::Signal::neutral()),
            },
            FunctionSpec::MomiOvershoot(params) => match bar_window(inputs) {
                Some(bars) => Value::Signal(judgment::momi_overshoot(&bars, params)),
                None => Value::Signal(crate::compute::Signal::neutral()),
            },
        }
    }
}

fn scalars(inputs: &[Option<Value>]) -> SmallVec<[Option<f64>; 8]> {
    inputs.iter().map(|v| v.as_ref().and_then(Value::as_scalar)).collect()
}

fn first_scalar(inputs: &[Option<Value>]) -> Option<f64> {
    inputs.first().and_then(|v| v.as_ref()).and_then(Value::as_scalar)
}

/// A judgment window is only usable when every bar arrived: a gap breaks
/// the consecutive-bars premise, so the judgment stays neutral.
fn bar_window(inputs: &[Option<Value>]) -> Option<SmallVec<[OhlcBar; 8]>> {
    inputs
        .iter()
        .map(|v| v.as_ref().and_then(Value::as_bar).copied())
        .collect()
}
