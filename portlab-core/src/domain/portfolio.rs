//! PortfolioState — aggregate cash, slot and exposure accounting.

use serde::{Deserialize, Serialize};

/// Portfolio-wide state, one instance per run, owned by the simulator.
///
/// `cash` is realized equity: it starts at the initial capital and moves
/// only when a trade closes (entry does not debit it; open positions are
/// carried as mark-to-market on top). `exposure` is the sum of the at-entry
/// dollar risk of all open positions and is released the moment a position
/// closes, so freed budget is available to entries on the same bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: f64,
    pub initial_capital: f64,
    pub open_positions: usize,
    pub exposure: f64,
}

impl PortfolioState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            open_positions: 0,
            exposure: 0.0,
        }
    }

    /// Account for an admission: one slot, `risk_amount` of exposure.
    pub fn admit(&mut self, risk_amount: f64) {
        self.open_positions += 1;
        self.exposure += risk_amount;
    }

    /// Account for a close: realize `pnl`, release the slot and exposure.
    pub fn release(&mut self, risk_amount: f64, pnl: f64) {
        debug_assert!(self.open_positions > 0, "release() with no open positions");
        self.open_positions -= 1;
        self.exposure = (self.exposure - risk_amount).max(0.0);
        self.cash += pnl;
    }

    /// Equity = realized cash + mark-to-market unrealized PnL.
    pub fn equity(&self, unrealized_pnl: f64) -> f64 {
        self.cash + unrealized_pnl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_initial_capital() {
        let portfolio = PortfolioState::new(100_000.0);
        assert_eq!(portfolio.cash, 100_000.0);
        assert_eq!(portfolio.open_positions, 0);
        assert_eq!(portfolio.exposure, 0.0);
    }

    #[test]
    fn admit_and_release_roundtrip() {
        let mut portfolio = PortfolioState::new(100_000.0);
        portfolio.admit(2_000.0);
        portfolio.admit(2_000.0);
        assert_eq!(portfolio.open_positions, 2);
        assert_eq!(portfolio.exposure, 4_000.0);

        portfolio.release(2_000.0, 350.0);
        assert_eq!(portfolio.open_positions, 1);
        assert_eq!(portfolio.exposure, 2_000.0);
        assert_eq!(portfolio.cash, 100_350.0);
    }

    #[test]
    fn release_clamps_exposure_at_zero() {
        let mut portfolio = PortfolioState::new(100_000.0);
        portfolio.admit(1_000.0);
        // Float drift could leave exposure a hair negative; it clamps.
        portfolio.release(1_000.0000001, -50.0);
        assert_eq!(portfolio.exposure, 0.0);
        assert_eq!(portfolio.cash, 99_950.0);
    }

    #[test]
    fn equity_adds_unrealized() {
        let portfolio = PortfolioState::new(100_000.0);
        assert_eq!(portfolio.equity(1_234.0), 101_234.0);
        assert_eq!(portfolio.equity(-500.0), 99_500.0);
    }
}
