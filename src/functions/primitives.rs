//! Primitive function implementations.
//!
//! All functions are total over `&[Option<f64>]`: absent inputs follow each
//! function's documented substitution policy instead of aborting a pass.

use chrono::{DateTime, Timelike};

/// numerator / sum(denominator terms). Fewer than two inputs or a zero
/// denominator sum yield 0.0. Absent entries are skipped, not zeroed.
pub fn ratio(inputs: &[Option<f64>]) -> f64 {
    if inputs.len() < 2 {
        return 0.0;
    }
    let numerator = match inputs[0] {
        Some(v) => v,
        None => return 0.0,
    };
    let denominator: f64 = inputs[1..].iter().flatten().sum();
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Arithmetic sum, skipping absent entries. Empty input sums to 0.0.
pub fn sum(inputs: &[Option<f64>]) -> f64 {
    inputs.iter().flatten().sum()
}

/// The first input is the condition, the rest are options. The condition is
/// rounded and read as a 1-based option index; zero, absent, non-finite or
/// out-of-range conditions (and absent options) return `default`.
pub fn select(inputs: &[Option<f64>], default: f64) -> f64 {
    let condition = match inputs.first().copied().flatten() {
        Some(c) if c.is_finite() => c,
        _ => return default,
    };
    let options = &inputs[1..];
    let index = condition.round();
    if index < 1.0 || index > options.len() as f64 {
        return default;
    }
    options[index as usize - 1].unwrap_or(default)
}

/// 1-based index of the maximum entry if it exceeds `threshold`, else 0.
/// Absent entries are excluded from the ranking; ties keep the lowest index.
pub fn leader_select(inputs: &[Option<f64>], threshold: f64) -> f64 {
    let mut leader = 0usize;
    let mut best = f64::NEG_INFINITY;
    for (i, value) in inputs.iter().enumerate() {
        if let Some(v) = value {
            if *v > best {
                best = *v;
                leader = i + 1;
            }
        }
    }
    if leader == 0 || best <= threshold {
        0.0
    } else {
        leader as f64
    }
}

/// Splits a signed value into `(up, down)` magnitudes. Absent → (0, 0).
pub fn dual_direction(input: Option<f64>) -> (f64, f64) {
    match input {
        Some(v) => (v.max(0.0), (-v).max(0.0)),
        None => (0.0, 0.0),
    }
}

/// `abs(value - reference)`; an absent value is substituted with 0 first,
/// so the result degrades to `abs(reference)`.
pub fn absolute_distance(input: Option<f64>, reference: f64) -> f64 {
    (input.unwrap_or(0.0) - reference).abs()
}

/// `a - b` with absent entries as 0. Fewer than two inputs yield 0.0.
pub fn subtract(inputs: &[Option<f64>]) -> f64 {
    if inputs.len() < 2 {
        return 0.0;
    }
    inputs[0].unwrap_or(0.0) - inputs[1].unwrap_or(0.0)
}

/// Rounds half away from zero to the nearest multiple of `tick`.
/// `tick <= 0` degrades to the identity; absent input rounds 0.
pub fn round_to_tick(input: Option<f64>, tick: f64) -> f64 {
    let v = input.unwrap_or(0.0);
    if tick <= 0.0 {
        return v;
    }
    (v / tick).round() * tick
}

/// Minute-of-hour from an epoch-seconds input. Absent or unrepresentable
/// timestamps extract 0.
pub fn minute_extract(input: Option<f64>) -> f64 {
    let secs = match input {
        Some(v) if v.is_finite() => v as i64,
        _ => return 0.0,
    };
    match DateTime::from_timestamp(secs, 0) {
        Some(ts) => ts.minute() as f64,
        None => 0.0,
    }
}
