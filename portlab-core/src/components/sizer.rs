//! Position sizer — volatility-adjusted risk sizing.
//!
//! # Formula
//! ```text
//! risk_amount      = equity * risk_per_trade
//! distance_to_stop = trailing_atr_multiplier * max(atr, price * floor)
//! quantity         = risk_amount / distance_to_stop
//! ```
//!
//! Entry fills at the admitting bar's close; no slippage is modeled. The
//! initial stop sits one full stop-distance away from entry.

use crate::domain::PositionSide;

use super::floored_atr;

/// Output of the sizer: everything the simulator needs to open a position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sizing {
    pub quantity: f64,
    pub distance_to_stop: f64,
    pub initial_stop: f64,
    /// Dollar risk committed at entry, charged against portfolio exposure.
    pub risk_amount: f64,
}

/// Size a trade. Pure.
///
/// Returns `None` when the inputs cannot produce a meaningful position:
/// non-positive equity, a non-finite price, or a degenerate quantity.
pub fn size_position(
    equity: f64,
    risk_per_trade: f64,
    price: f64,
    atr: f64,
    trailing_atr_multiplier: f64,
    side: PositionSide,
) -> Option<Sizing> {
    if side == PositionSide::Flat {
        return None;
    }
    if !equity.is_finite() || equity <= 0.0 || !price.is_finite() || price <= 0.0 {
        return None;
    }

    let risk_amount = equity * risk_per_trade;
    let distance_to_stop = trailing_atr_multiplier * floored_atr(atr, price);
    let quantity = risk_amount / distance_to_stop;
    if !quantity.is_finite() || quantity <= 0.0 {
        return None;
    }

    let initial_stop = match side {
        PositionSide::Long => price - distance_to_stop,
        PositionSide::Short => price + distance_to_stop,
        PositionSide::Flat => unreachable!(),
    };

    Some(Sizing {
        quantity,
        distance_to_stop,
        initial_stop,
        risk_amount,
    })
}
