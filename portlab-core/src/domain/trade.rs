//! Trade — one append-only ledger entry per completed round trip.

use super::position::PositionSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position left the book.
///
/// `BreakevenStop` and `TrailingStop` are the same stop mechanism; the split
/// exists only so reports can separate protected exits from trailed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TrailingStop,
    BreakevenStop,
    EndOfData,
}

/// A complete round-trip trade record: entry → exit. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: PositionSide,

    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    pub quantity: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Return on the trade as a fraction of entry cost.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.quantity == 0.0 {
            return 0.0;
        }
        self.pnl / (self.entry_price * self.quantity)
    }
}
