//! AssetState — per-asset position state, owned exclusively by the simulator.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Which way a position points. `Flat` means no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

impl PositionSide {
    pub fn is_flat(self) -> bool {
        self == PositionSide::Flat
    }
}

/// Full lifecycle state for one asset.
///
/// Created flat at run start, mutated only by entry admission (flat → long /
/// short) and the exit manager (long / short → flat). The stop level obeys
/// the ratchet invariant for the life of a position: non-decreasing for
/// longs, non-increasing for shorts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetState {
    pub side: PositionSide,
    pub entry_price: f64,
    pub entry_time: Option<NaiveDateTime>,
    pub entry_bar: usize,
    pub quantity: f64,
    pub stop_level: f64,
    /// Highest high since entry (longs); tracked for the trailing stop.
    pub highest_since_entry: f64,
    /// Lowest low since entry (shorts).
    pub lowest_since_entry: f64,
    /// Set once by the breakeven ratchet; never cleared while open.
    pub breakeven_hit: bool,
    /// ATR at entry — the breakeven trigger is measured against this, not
    /// against the current bar's ATR.
    pub entry_atr: f64,
    /// Dollar risk committed at entry (equity * risk_per_trade). Released
    /// from portfolio exposure on close.
    pub risk_amount: f64,
}

impl AssetState {
    /// A flat state, as every asset starts the run.
    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            entry_price: 0.0,
            entry_time: None,
            entry_bar: 0,
            quantity: 0.0,
            stop_level: 0.0,
            highest_since_entry: 0.0,
            lowest_since_entry: 0.0,
            breakeven_hit: false,
            entry_atr: 0.0,
            risk_amount: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side.is_flat()
    }

    /// Admit a position. Extremes seed at the entry price.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        &mut self,
        side: PositionSide,
        entry_price: f64,
        entry_time: NaiveDateTime,
        entry_bar: usize,
        quantity: f64,
        stop_level: f64,
        entry_atr: f64,
        risk_amount: f64,
    ) {
        debug_assert!(self.is_flat(), "open() on a non-flat asset");
        debug_assert!(side != PositionSide::Flat);
        self.side = side;
        self.entry_price = entry_price;
        self.entry_time = Some(entry_time);
        self.entry_bar = entry_bar;
        self.quantity = quantity;
        self.stop_level = stop_level;
        self.highest_since_entry = entry_price;
        self.lowest_since_entry = entry_price;
        self.breakeven_hit = false;
        self.entry_atr = entry_atr;
        self.risk_amount = risk_amount;
    }

    /// Return to flat. The exit manager records the trade before calling this.
    pub fn close(&mut self) {
        *self = Self::flat();
    }

    /// Side-signed unrealized PnL at `price`. Zero when flat.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Flat => 0.0,
            PositionSide::Long => (price - self.entry_price) * self.quantity,
            PositionSide::Short => (self.entry_price - price) * self.quantity,
        }
    }
}
