//! Leaf components of the simulator: rank scorer, entry gate, position
//! sizer, exit manager. All pure or state-machine local; the portfolio
//! simulator wires them together in a fixed per-bar order.

pub mod exits;
pub mod gate;
pub mod rank;
pub mod sizer;

pub use exits::{ExitDecision, ExitManager};
pub use gate::EntryGate;
pub use rank::momentum_score;
pub use sizer::{size_position, Sizing};

use crate::config::MIN_ATR_FRACTION;

/// ATR with the volatility floor applied: `max(atr, price * MIN_ATR_FRACTION)`.
///
/// A non-finite or non-positive ATR collapses to the floor, so every
/// division by ATR in the rank scorer and the sizer stays finite.
pub fn floored_atr(atr: f64, price: f64) -> f64 {
    let floor = price.abs() * MIN_ATR_FRACTION;
    if atr.is_finite() && atr > floor {
        atr
    } else {
        floor
    }
}
