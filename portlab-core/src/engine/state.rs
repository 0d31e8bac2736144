//! Mutable run state and the run result type.

use serde::{Deserialize, Serialize};

use crate::domain::{AssetState, PortfolioState, Symbol, Trade};

/// State that evolves bar-by-bar during a run. One instance per run, never
/// shared: parallel runs each own their state and can be dropped
/// independently on cancellation.
#[derive(Debug)]
pub struct SimState {
    pub asset_states: Vec<AssetState>,
    pub portfolio: PortfolioState,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    /// Last non-void close per asset, for mark-to-market carry-forward.
    pub last_valid_close: Vec<f64>,
    /// Assets excluded at run start for insufficient history.
    pub skipped: Vec<bool>,
    pub vetoed_bars: usize,
}

impl SimState {
    pub fn new(num_assets: usize, num_bars: usize, initial_capital: f64) -> Self {
        Self {
            asset_states: vec![AssetState::flat(); num_assets],
            portfolio: PortfolioState::new(initial_capital),
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(num_bars),
            last_valid_close: vec![f64::NAN; num_assets],
            skipped: vec![false; num_assets],
            vetoed_bars: 0,
        }
    }

    /// Mark-to-market unrealized PnL over all open positions, using the
    /// last valid close per asset.
    pub fn unrealized_pnl(&self) -> f64 {
        self.asset_states
            .iter()
            .zip(&self.last_valid_close)
            .filter(|(state, _)| !state.is_flat())
            .map(|(state, &close)| {
                if close.is_finite() {
                    state.unrealized_pnl(close)
                } else {
                    0.0
                }
            })
            .sum()
    }
}

/// Output of a complete run: the ordered trade ledger, one equity point per
/// bar, and run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub final_equity: f64,
    pub initial_capital: f64,
    pub bar_count: usize,
    /// Assets excluded for insufficient history (EmptyHistory policy).
    pub skipped_assets: Vec<Symbol>,
    /// Bars on which the volatility veto blocked all new entries.
    pub vetoed_bars: usize,
}

impl RunResult {
    /// Total return over the run as a fraction of initial capital.
    pub fn total_return(&self) -> f64 {
        if self.initial_capital == 0.0 {
            return 0.0;
        }
        (self.final_equity - self.initial_capital) / self.initial_capital
    }
}
