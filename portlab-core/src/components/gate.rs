//! Entry gate — macro regime filter, volatility veto input, and the
//! single-position rule, combined into one candidacy decision.

use crate::config::{MacroFilterType, RunConfig};
use crate::domain::{AssetState, MarketBar};

/// Standard deviations below this are treated as "no dispersion" and yield
/// a neutral z-score of 0.
const MIN_STD: f64 = 1e-12;

/// Rolling z-score of ATR at bar `t` over a trailing `lookback` window
/// (inclusive of `t`). Pure.
///
/// Feeds the system-wide volatility veto. Insufficient or non-finite
/// history, or a degenerate (near-zero) standard deviation, yields 0 — a
/// neutral value that never trips the veto on its own.
pub fn atr_zscore(bars: &[MarketBar], t: usize, lookback: usize) -> f64 {
    if t + 1 < lookback || t >= bars.len() {
        return 0.0;
    }

    let window = &bars[t + 1 - lookback..=t];
    if window.iter().any(|b| !b.atr.is_finite()) {
        return 0.0;
    }

    let n = window.len() as f64;
    let mean = window.iter().map(|b| b.atr).sum::<f64>() / n;
    let variance = window.iter().map(|b| (b.atr - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std < MIN_STD {
        return 0.0;
    }

    let z = (bars[t].atr - mean) / std;
    if z.is_finite() {
        z
    } else {
        0.0
    }
}

/// Per-asset candidacy decision.
///
/// The veto itself is portfolio-wide and is resolved by the simulator
/// before the gate is consulted; the gate receives it as a precomputed
/// flag so the regime logic stays a pure per-asset predicate.
#[derive(Debug, Clone)]
pub struct EntryGate {
    filter: MacroFilterType,
    htf_threshold: f64,
    ltf_threshold: f64,
}

impl EntryGate {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            filter: config.macro_filter_type,
            htf_threshold: config.htf_threshold,
            ltf_threshold: config.ltf_threshold,
        }
    }

    /// Does this bar's regime admit new entries for the asset?
    ///
    /// NaN metrics fail every comparison, so a bar with missing regime data
    /// is simply not a candidate — no special-casing needed.
    pub fn regime_admits(&self, bar: &MarketBar) -> bool {
        let htf_trending = bar.htf_metric >= self.htf_threshold;
        let htf_expanding = bar.htf_metric < self.htf_threshold;
        let ltf_compressed = bar.ltf_metric > self.ltf_threshold;

        match self.filter {
            MacroFilterType::Hurst => htf_trending,
            MacroFilterType::Chop => htf_expanding && ltf_compressed,
            // The literal hurst+chop conjunction is unsatisfiable on one HTF
            // metric; `both` takes the HTF persistence condition plus the
            // LTF compression condition.
            MacroFilterType::Both => htf_trending && ltf_compressed,
        }
    }

    /// Full candidacy: regime admits, no system-wide veto, asset is flat.
    pub fn is_candidate(&self, bar: &MarketBar, state: &AssetState, veto_active: bool) -> bool {
        if veto_active {
            return false;
        }
        if !state.is_flat() {
            return false;
        }
        self.regime_admits(bar)
    }
}
