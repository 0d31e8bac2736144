//! Fatal error taxonomy.
//!
//! Only two failure classes stop a run, and both fire before the first bar
//! is processed: configuration problems and input misalignment. Per-bar
//! numeric irregularities (NaN scores, zero ATR) are absorbed with
//! documented fallbacks and never abort a simulation.

use thiserror::Error;

/// Invalid run configuration. Raised by `RunConfig::validate()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be in ({low}, {high}]: got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        low: f64,
        high: f64,
    },

    #[error("{field} must be positive: got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be finite: got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must be non-negative: got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be at least {min}: got {value}")]
    TooSmall {
        field: &'static str,
        value: usize,
        min: usize,
    },

    #[error(
        "breakeven_atr_threshold ({breakeven}) must be strictly less than \
         trailing_atr_multiplier ({trailing}): the breakeven ratchet could \
         never fire before the trailing stop exits the trade"
    )]
    BreakevenNotBelowTrailing { breakeven: f64, trailing: f64 },
}

/// Misaligned input series. Raised when the bar matrix is constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignmentError {
    #[error("no assets supplied")]
    NoAssets,

    #[error("empty timestamp axis")]
    EmptyAxis,

    #[error("asset '{symbol}' has {actual} bars, expected {expected} (timestamp axis length)")]
    LengthMismatch {
        symbol: String,
        actual: usize,
        expected: usize,
    },

    #[error("duplicate asset symbol '{symbol}'")]
    DuplicateSymbol { symbol: String },
}

/// Anything that can stop a simulation before its loop starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data alignment error: {0}")]
    Alignment(#[from] AlignmentError),
}
