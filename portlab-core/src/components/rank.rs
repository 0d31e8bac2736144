//! Rank scorer — volatility-normalized momentum, one comparable number per
//! asset per bar.
//!
//! `score = (close_now - close_lookback_ago) / max(atr, close * floor)`.
//! Non-finite results (missing history, degenerate inputs) collapse to 0, a
//! neutral, non-competitive score. All NaN scrubbing for ranking happens
//! here and nowhere else.

use crate::domain::MarketBar;

use super::floored_atr;

/// Momentum score at bar `t` over `lookback` bars. Pure.
///
/// Returns 0.0 when history is insufficient (`t < lookback`), when either
/// close is non-finite, or when the normalized result is non-finite.
pub fn momentum_score(bars: &[MarketBar], t: usize, lookback: usize) -> f64 {
    if t < lookback || t >= bars.len() {
        return 0.0;
    }

    let now = &bars[t];
    let then = &bars[t - lookback];
    if !now.close.is_finite() || !then.close.is_finite() {
        return 0.0;
    }

    let score = (now.close - then.close) / floored_atr(now.atr, now.close);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}
