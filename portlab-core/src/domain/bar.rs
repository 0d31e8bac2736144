//! MarketBar — the fundamental per-asset market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One bar of market data for a single asset, enriched with the signal
/// layer's per-bar metrics.
///
/// The regime metrics (`htf_metric`, `ltf_metric`) arrive already resampled,
/// shifted by one period and forward-filled to this bar's timeframe — the
/// signal layer owns that alignment, the simulator only consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Average true range at this bar (volatility proxy).
    pub atr: f64,
    /// Higher-timeframe regime metric (Hurst or choppiness, per filter mode).
    pub htf_metric: f64,
    /// Lower-timeframe regime metric.
    pub ltf_metric: f64,
}

impl MarketBar {
    /// Returns true if any OHLC field is non-finite (void bar).
    ///
    /// Void bars are produced by multi-asset alignment when an asset has no
    /// data on a shared timestamp. They carry no candidacy and no exit
    /// evaluation.
    pub fn is_void(&self) -> bool {
        !self.open.is_finite()
            || !self.high.is_finite()
            || !self.low.is_finite()
            || !self.close.is_finite()
    }

    /// Basic OHLC sanity check: high >= low, high/low bracket open and close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}
