//! Domain judgment functions over short bar windows.
//!
//! Each judgment consumes 2-5 consecutive OHLC bars (oldest first), derives
//! the Heikin-Ashi counterpart in-window, and returns a direction plus a
//! confidence in [0, 1]. Every numeric threshold is a tunable parameter
//! supplied per currency pair through `config::EngineConfig`; nothing here
//! is hard-coded to a pair.

use crate::compute::{Direction, Signal};
use crate::market::{heikin_ashi, OhlcBar};
use serde::{Deserialize, Serialize};

/// Thresholds for the same/reverse (dokyaku) judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DokyakuParams {
    /// Pip size of the pair's quote.
    pub pip: f64,
    /// Price/Heikin-Ashi deviation (in pips) at which the judgment's
    /// confidence saturates.
    pub deviation_full: f64,
}

impl DokyakuParams {
    pub fn for_pip(pip: f64) -> Self {
        Self { pip, deviation_full: 10.0 }
    }
}

/// Thresholds for the go/return (ikikaeri) judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IkikaeriParams {
    pub pip: f64,
    /// New-extreme extension (in pips) at which continuation confidence
    /// saturates.
    pub extension_full: f64,
    /// Confidence assigned to a pause (same direction, no new extreme).
    pub pause_confidence: f64,
}

impl IkikaeriParams {
    pub fn for_pip(pip: f64) -> Self {
        Self { pip, extension_full: 8.0, pause_confidence: 0.4 }
    }
}

/// Thresholds for the momi/overshoot judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomiParams {
    pub pip: f64,
    /// Window range (in pips) under which the market counts as
    /// consolidating ("momi").
    pub range_pips: f64,
    /// Breakout excess relative to the prior range width required for a
    /// full-confidence overshoot.
    pub overshoot_scale: f64,
}

impl MomiParams {
    pub fn for_pip(pip: f64) -> Self {
        Self { pip, range_pips: 20.0, overshoot_scale: 0.5 }
    }
}

/// The three judgment parameter sets for one currency pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentParams {
    pub dokyaku: DokyakuParams,
    pub ikikaeri: IkikaeriParams,
    pub momi: MomiParams,
}

impl JudgmentParams {
    pub fn for_pip(pip: f64) -> Self {
        Self {
            dokyaku: DokyakuParams::for_pip(pip),
            ikikaeri: IkikaeriParams::for_pip(pip),
            momi: MomiParams::for_pip(pip),
        }
    }
}

/// Same/reverse judgment: does the latest bar continue the smoothed trend?
///
/// Real close direction and Heikin-Ashi close direction agreeing reads as
/// continuation; confidence decays as price deviates from its smoothed
/// counterpart. Disagreement reads as reversal toward the smoothed side,
/// with confidence growing in the deviation.
pub fn dokyaku(bars: &[OhlcBar], params: &DokyakuParams) -> Signal {
    if bars.len() < 2 {
        return Signal::neutral();
    }
    let ha = heikin_ashi(bars);
    let last = bars.len() - 1;

    let real_dir = sign(bars[last].close - bars[last - 1].close);
    let ha_dir = sign(ha[last].close - ha[last - 1].close);
    if real_dir == 0 || ha_dir == 0 {
        return Signal::neutral();
    }

    let deviation_pips = (bars[last].close - ha[last].close).abs() / params.pip;
    let saturation = (deviation_pips / params.deviation_full).min(1.0);

    if real_dir == ha_dir {
        Signal::new(Direction::from_sign(real_dir), 1.0 - saturation)
    } else {
        Signal::new(Direction::from_sign(ha_dir), saturation)
    }
}

/// Go/return judgment: classify the short-term wave pattern.
///
/// Two consecutive bars in the same direction that print a new extreme are
/// a "go-go" continuation; same direction without a new extreme is a pause;
/// a direction flip is a "return" whose confidence scales with the flip
/// bar's body against the previous body.
pub fn ikikaeri(bars: &[OhlcBar], params: &IkikaeriParams) -> Signal {
    if bars.len() < 3 {
        return Signal::neutral();
    }
    let last = bars.len() - 1;
    let cur = &bars[last];
    let prev = &bars[last - 1];

    let cur_dir = cur.direction();
    let prev_dir = prev.direction();
    if cur_dir == 0 {
        return Signal::neutral();
    }

    if cur_dir == prev_dir {
        let extension = if cur_dir > 0 { cur.high - prev.high } else { prev.low - cur.low };
        if extension > 0.0 {
            let conf = (extension / params.pip / params.extension_full).min(1.0);
            return Signal::new(Direction::from_sign(cur_dir), conf.max(params.pause_confidence));
        }
        return Signal::new(Direction::from_sign(cur_dir), params.pause_confidence);
    }

    // Direction flipped: a return wave in the new direction.
    let prev_body = prev.body().abs();
    let conf = if prev_body > 0.0 { (cur.body().abs() / prev_body).min(1.0) } else { 0.5 };
    Signal::new(Direction::from_sign(cur_dir), conf)
}

/// Momi/overshoot judgment: narrow consolidation vs range breakout.
///
/// The range is measured over all bars but the last; the last close either
/// breaks out of it (overshoot, direction of the break, confidence scaled
/// by the volatility-normalized excess) or the whole window is narrow
/// enough to count as momi (neutral, confidence growing as the range
/// tightens).
pub fn momi_overshoot(bars: &[OhlcBar], params: &MomiParams) -> Signal {
    if bars.len() < 2 {
        return Signal::neutral();
    }
    let (prior, last) = bars.split_at(bars.len() - 1);
    let hi = prior.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let lo = prior.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let width = (hi - lo).max(params.pip);
    let close = last[0].close;

    // Breakout beyond the prior range, scaled by that range's own width.
    let full_excess = width * params.overshoot_scale;
    if close > hi {
        let conf = ((close - hi) / full_excess).min(1.0);
        return Signal::new(Direction::Up, conf);
    }
    if close < lo {
        let conf = ((lo - close) / full_excess).min(1.0);
        return Signal::new(Direction::Down, conf);
    }

    let window_hi = hi.max(last[0].high);
    let window_lo = lo.min(last[0].low);
    let window_pips = (window_hi - window_lo) / params.pip;
    if window_pips < params.range_pips {
        return Signal::new(Direction::Neutral, 1.0 - window_pips / params.range_pips);
    }
    Signal::neutral()
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> OhlcBar {
        OhlcBar::new(open, high, low, close)
    }

    fn params() -> JudgmentParams {
        JudgmentParams::for_pip(0.01)
    }

    #[test]
    fn dokyaku_agreeing_directions_read_continuation() {
        // Steady climb: real and smoothed closes both rise.
        let bars = [
            bar(110.00, 110.06, 109.98, 110.05),
            bar(110.05, 110.12, 110.03, 110.10),
            bar(110.10, 110.18, 110.08, 110.16),
        ];
        let s = dokyaku(&bars, &params().dokyaku);
        assert_eq!(s.direction, Direction::Up);
        assert!(s.confidence > 0.0);
    }

    #[test]
    fn dokyaku_disagreement_reads_reversal_toward_smoothed() {
        // Long climb, then a sharp down close while the smoothed series
        // still rises: real dir down, HA dir up -> reversal signal up.
        let bars = [
            bar(110.00, 110.30, 109.95, 110.28),
            bar(110.28, 110.60, 110.25, 110.55),
            bar(110.55, 110.58, 110.35, 110.40),
        ];
        let s = dokyaku(&bars, &params().dokyaku);
        assert_eq!(s.direction, Direction::Up);
        assert!(s.confidence > 0.0);
    }

    #[test]
    fn dokyaku_short_window_is_neutral() {
        let bars = [bar(110.0, 110.1, 109.9, 110.05)];
        assert_eq!(dokyaku(&bars, &params().dokyaku), Signal::neutral());
    }

    #[test]
    fn ikikaeri_new_high_is_go_go() {
        let bars = [
            bar(110.00, 110.05, 109.97, 110.03),
            bar(110.03, 110.10, 110.00, 110.08),
            bar(110.08, 110.20, 110.06, 110.17),
        ];
        let s = ikikaeri(&bars, &params().ikikaeri);
        assert_eq!(s.direction, Direction::Up);
        assert!(s.confidence > params().ikikaeri.pause_confidence);
    }

    #[test]
    fn ikikaeri_no_new_extreme_is_pause() {
        let bars = [
            bar(110.00, 110.05, 109.97, 110.03),
            bar(110.03, 110.20, 110.00, 110.15),
            bar(110.15, 110.19, 110.14, 110.17), // up again, but inside the prior high
        ];
        let s = ikikaeri(&bars, &params().ikikaeri);
        assert_eq!(s.direction, Direction::Up);
        assert_relative_eq!(s.confidence, params().ikikaeri.pause_confidence);
    }

    #[test]
    fn ikikaeri_flip_is_return() {
        let bars = [
            bar(110.00, 110.10, 109.98, 110.08),
            bar(110.08, 110.16, 110.06, 110.14),
            bar(110.14, 110.15, 109.99, 110.00), // strong down bar
        ];
        let s = ikikaeri(&bars, &params().ikikaeri);
        assert_eq!(s.direction, Direction::Down);
        assert!(s.confidence > 0.5);
    }

    #[test]
    fn momi_narrow_window_is_neutral_with_confidence() {
        // 10-pip window against a 20-pip momi ceiling.
        let bars = [
            bar(110.00, 110.06, 110.00, 110.04),
            bar(110.04, 110.08, 110.01, 110.03),
            bar(110.03, 110.07, 110.00, 110.05),
        ];
        let s = momi_overshoot(&bars, &params().momi);
        assert_eq!(s.direction, Direction::Neutral);
        assert!(s.confidence > 0.0);
    }

    #[test]
    fn overshoot_breaks_upward() {
        let bars = [
            bar(110.00, 110.10, 109.90, 110.05),
            bar(110.05, 110.12, 109.95, 110.02),
            bar(110.02, 110.40, 110.00, 110.35), // close well above prior high
        ];
        let s = momi_overshoot(&bars, &params().momi);
        assert_eq!(s.direction, Direction::Up);
        assert!(s.confidence > 0.9);
    }

    #[test]
    fn overshoot_breaks_downward() {
        let bars = [
            bar(110.00, 110.10, 109.90, 110.05),
            bar(110.05, 110.12, 109.95, 110.02),
            bar(110.02, 110.05, 109.60, 109.65),
        ];
        let s = momi_overshoot(&bars, &params().momi);
        assert_eq!(s.direction, Direction::Down);
        assert!(s.confidence > 0.9);
    }

    #[test]
    fn wide_range_without_breakout_is_plain_neutral() {
        // 60-pip window, close inside the prior range: neither momi nor
        // overshoot.
        let bars = [
            bar(110.00, 110.60, 110.00, 110.30),
            bar(110.30, 110.55, 110.05, 110.20),
            bar(110.20, 110.45, 110.10, 110.30),
        ];
        let s = momi_overshoot(&bars, &params().momi);
        assert_eq!(s, Signal::neutral());
    }
}
