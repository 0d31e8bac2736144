//! Run configuration — validated once, immutable for the run.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Volatility floor, as a fraction of price. ATR values below
/// `close * MIN_ATR_FRACTION` are replaced by the floor wherever ATR
/// divides something (rank scores, stop distances), so a dead-flat series
/// never produces a division blow-up.
pub const MIN_ATR_FRACTION: f64 = 1e-3;

/// Which macro regime gate admits candidates.
///
/// Parsed once at configuration load; an unknown string is a fatal
/// deserialization error, never a per-bar string compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroFilterType {
    /// Persistence gate: higher-timeframe metric at or above `htf_threshold`.
    Hurst,
    /// Compression gate: HTF metric below `htf_threshold` (macro expansion)
    /// and LTF metric above `ltf_threshold` (local compression).
    Chop,
    /// HTF persistence condition plus the LTF compression condition.
    Both,
}

/// How a stop breach fills.
///
/// The source material assumes an exact fill at the stop level and never
/// pins down gap-through behavior, so the choice stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopFillPolicy {
    /// Fill exactly at the stop level.
    AtStop,
    /// If the bar opens through the stop, fill at the open instead.
    GapAware,
}

/// All parameters of a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub initial_capital: f64,
    /// Fraction of equity risked per trade, in (0, 1].
    pub risk_per_trade: f64,
    pub max_concurrent_trades: usize,
    /// Cap on aggregate at-entry risk, as a fraction of equity, in (0, 1].
    pub max_portfolio_exposure: f64,
    pub trailing_atr_multiplier: f64,
    /// Favorable move (in entry-ATR units) that triggers the breakeven jump.
    /// Must be strictly below `trailing_atr_multiplier`.
    pub breakeven_atr_threshold: f64,
    pub macro_filter_type: MacroFilterType,
    pub htf_threshold: f64,
    pub ltf_threshold: f64,
    /// ATR z-score above which the bar is vetoed for new entries, system-wide.
    pub veto_threshold: f64,
    /// Rank scorer lookback, in bars.
    pub momentum_lookback: usize,
    /// Breakeven stop offset above/below entry, as a fraction of entry price.
    pub fee_margin_pct: f64,
    /// Window for the rolling ATR z-score feeding the veto.
    pub vol_zscore_lookback: usize,
    pub stop_fill: StopFillPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            risk_per_trade: 0.02,
            max_concurrent_trades: 3,
            max_portfolio_exposure: 0.06,
            trailing_atr_multiplier: 3.0,
            breakeven_atr_threshold: 2.0,
            macro_filter_type: MacroFilterType::Both,
            htf_threshold: 0.6,
            ltf_threshold: 61.8,
            veto_threshold: 3.0,
            momentum_lookback: 20,
            fee_margin_pct: 0.002,
            vol_zscore_lookback: 50,
            stop_fill: StopFillPolicy::AtStop,
        }
    }
}

impl RunConfig {
    /// Validate every field. Called once before a run; the simulator refuses
    /// to start on the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fraction_field("risk_per_trade", self.risk_per_trade)?;
        fraction_field("max_portfolio_exposure", self.max_portfolio_exposure)?;
        positive_field("initial_capital", self.initial_capital)?;
        positive_field("trailing_atr_multiplier", self.trailing_atr_multiplier)?;
        positive_field("breakeven_atr_threshold", self.breakeven_atr_threshold)?;

        if self.breakeven_atr_threshold >= self.trailing_atr_multiplier {
            return Err(ConfigError::BreakevenNotBelowTrailing {
                breakeven: self.breakeven_atr_threshold,
                trailing: self.trailing_atr_multiplier,
            });
        }

        finite_field("htf_threshold", self.htf_threshold)?;
        finite_field("ltf_threshold", self.ltf_threshold)?;
        positive_field("veto_threshold", self.veto_threshold)?;

        if !self.fee_margin_pct.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "fee_margin_pct",
                value: self.fee_margin_pct,
            });
        }
        if self.fee_margin_pct < 0.0 {
            return Err(ConfigError::Negative {
                field: "fee_margin_pct",
                value: self.fee_margin_pct,
            });
        }

        if self.max_concurrent_trades < 1 {
            return Err(ConfigError::TooSmall {
                field: "max_concurrent_trades",
                value: self.max_concurrent_trades,
                min: 1,
            });
        }
        if self.momentum_lookback < 1 {
            return Err(ConfigError::TooSmall {
                field: "momentum_lookback",
                value: self.momentum_lookback,
                min: 1,
            });
        }
        if self.vol_zscore_lookback < 2 {
            return Err(ConfigError::TooSmall {
                field: "vol_zscore_lookback",
                value: self.vol_zscore_lookback,
                min: 2,
            });
        }

        Ok(())
    }

    /// Deterministic content-addressable id for this configuration.
    ///
    /// Identical configs hash to identical ids, so sweep results can be
    /// deduplicated or cached by id.
    pub fn run_id(&self) -> String {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

fn positive_field(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

fn finite_field(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    Ok(())
}

fn fraction_field(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field, value });
    }
    if value <= 0.0 || value > 1.0 {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            low: 0.0,
            high: 1.0,
        });
    }
    Ok(())
}
