//! OHLC bar representation and Heikin-Ashi smoothing.
//!
//! Judgment nodes consume short windows (2-5 bars, oldest first) of these
//! and derive the smoothed counterpart in-window.

/// One market bar. Raw-data leaves carry these for judgment windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcBar {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self { open, high, low, close }
    }

    /// Signed body: positive for an up bar, negative for a down bar.
    pub fn body(&self) -> f64 {
        self.close - self.open
    }

    /// Bar direction as -1 / 0 / +1.
    pub fn direction(&self) -> i8 {
        let b = self.body();
        if b > 0.0 {
            1
        } else if b < 0.0 {
            -1
        } else {
            0
        }
    }
}

/// A Heikin-Ashi smoothed bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl HaBar {
    pub fn direction(&self) -> i8 {
        if self.close > self.open {
            1
        } else if self.close < self.open {
            -1
        } else {
            0
        }
    }
}

/// Computes the Heikin-Ashi series for a bar window.
///
/// ha_close = (o+h+l+c)/4; ha_open recurses as the midpoint of the previous
/// HA bar, seeded from the first real bar's open/close midpoint. High/low
/// absorb the recursive open/close so the smoothed bar never excludes them.
pub fn heikin_ashi(bars: &[OhlcBar]) -> Vec<HaBar> {
    let mut out: Vec<HaBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        let ha_close = (bar.open + bar.high + bar.low + bar.close) / 4.0;
        let ha_open = match out.last() {
            None => (bar.open + bar.close) / 2.0,
            Some(prev) => (prev.open + prev.close) / 2.0,
        };
        let ha_high = bar.high.max(ha_open).max(ha_close);
        let ha_low = bar.low.min(ha_open).min(ha_close);
        out.push(HaBar { open: ha_open, high: ha_high, low: ha_low, close: ha_close });
    }
    out
}
