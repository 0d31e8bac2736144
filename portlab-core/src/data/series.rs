//! Aligned multi-asset input data.
//!
//! The signal layer delivers one bar sequence per asset, already aligned to
//! a shared timestamp axis (including the shift-and-forward-fill of HTF
//! metrics that prevents look-ahead). The simulator verifies only the basic
//! index-length contract here; deeper alignment correctness is the
//! producer's responsibility.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{MarketBar, Symbol};
use crate::error::AlignmentError;

/// One asset's aligned bar sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSeries {
    pub symbol: Symbol,
    /// Same length as the matrix's timestamp axis. Missing data appears as
    /// void bars (non-finite OHLC), not as gaps.
    pub bars: Vec<MarketBar>,
}

impl AssetSeries {
    pub fn new(symbol: impl Into<Symbol>, bars: Vec<MarketBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Number of non-void bars in the series.
    pub fn valid_bar_count(&self) -> usize {
        self.bars.iter().filter(|b| !b.is_void()).count()
    }
}

/// The full aligned input: a shared timestamp axis and one equal-length bar
/// sequence per asset. Asset order is positional and stable — it defines
/// the documented ascending-index tie-break for equal rank scores.
#[derive(Debug, Clone)]
pub struct BarMatrix {
    pub timestamps: Vec<NaiveDateTime>,
    pub assets: Vec<AssetSeries>,
}

impl BarMatrix {
    /// Build a matrix, enforcing the index-length contract.
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        assets: Vec<AssetSeries>,
    ) -> Result<Self, AlignmentError> {
        if timestamps.is_empty() {
            return Err(AlignmentError::EmptyAxis);
        }
        if assets.is_empty() {
            return Err(AlignmentError::NoAssets);
        }

        for (i, asset) in assets.iter().enumerate() {
            if asset.bars.len() != timestamps.len() {
                return Err(AlignmentError::LengthMismatch {
                    symbol: asset.symbol.clone(),
                    actual: asset.bars.len(),
                    expected: timestamps.len(),
                });
            }
            if assets[..i].iter().any(|other| other.symbol == asset.symbol) {
                return Err(AlignmentError::DuplicateSymbol {
                    symbol: asset.symbol.clone(),
                });
            }
        }

        Ok(Self { timestamps, assets })
    }

    pub fn num_bars(&self) -> usize {
        self.timestamps.len()
    }

    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn bar(&self, asset: usize, t: usize) -> &MarketBar {
        &self.assets[asset].bars[t]
    }
}
