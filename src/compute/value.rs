//! The atomic unit of data flowing through the graph.

use crate::market::OhlcBar;

/// Trading direction emitted by judgment nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Neutral,
    Up,
    Down,
}

impl Direction {
    pub fn from_sign(sign: i8) -> Self {
        match sign {
            s if s > 0 => Direction::Up,
            s if s < 0 => Direction::Down,
            _ => Direction::Neutral,
        }
    }
}

/// A judgment verdict: direction plus confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub confidence: f64,
}

impl Signal {
    pub fn neutral() -> Self {
        Self { direction: Direction::Neutral, confidence: 0.0 }
    }

    pub fn new(direction: Direction, confidence: f64) -> Self {
        Self { direction, confidence: confidence.clamp(0.0, 1.0) }
    }
}

/// A node result. Most nodes produce scalars; dual-direction splits,
/// judgment signals and raw bar leaves carry small structured values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Split { up: f64, down: f64 },
    Signal(Signal),
    Bar(OhlcBar),
}

impl Value {
    /// Strict scalar coercion. Non-scalar values resolve as absent, so a
    /// downstream primitive fed a bar or a signal takes its documented
    /// missing-input path instead of silently reinterpreting the payload.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bar(&self) -> Option<&OhlcBar> {
        match self {
            Value::Bar(b) => Some(b),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<OhlcBar> for Value {
    fn from(b: OhlcBar) -> Self {
        Value::Bar(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_coercion_is_strict() {
        assert_eq!(Value::Scalar(1.5).as_scalar(), Some(1.5));
        assert_eq!(Value::Split { up: 1.0, down: 0.0 }.as_scalar(), None);
        assert_eq!(Value::Signal(Signal::neutral()).as_scalar(), None);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Signal::new(Direction::Up, 1.7).confidence, 1.0);
        assert_eq!(Signal::new(Direction::Down, -0.2).confidence, 0.0);
    }
}
