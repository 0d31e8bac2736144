//! Single-run orchestration — wires a validated config and pre-loaded data
//! through the core simulator and summarizes the outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use portlab_core::config::RunConfig;
use portlab_core::data::BarMatrix;
use portlab_core::domain::Trade;
use portlab_core::engine::{run_simulation, RunResult};
use portlab_core::error::SimError;

use crate::config::ConfigFileError;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigFileError),
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),
}

/// Complete result of a single run, keyed by its content-addressable id.
///
/// Carries everything a downstream metrics/reporting consumer needs: the
/// full ledger, the equity curve, and the exact configuration that produced
/// them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: String,
    pub config: RunConfig,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub final_equity: f64,
    pub total_return: f64,
    pub trade_count: usize,
    pub skipped_assets: Vec<String>,
    pub vetoed_bars: usize,
    pub bar_count: usize,
}

impl BacktestResult {
    fn from_run(config: &RunConfig, result: RunResult) -> Self {
        Self {
            run_id: config.run_id(),
            config: config.clone(),
            total_return: result.total_return(),
            final_equity: result.final_equity,
            trade_count: result.trades.len(),
            trades: result.trades,
            equity_curve: result.equity_curve,
            skipped_assets: result.skipped_assets,
            vetoed_bars: result.vetoed_bars,
            bar_count: result.bar_count,
        }
    }
}

/// Executes simulations over pre-loaded data.
///
/// Stateless and cheap to clone: each `run()` owns nothing shared, so a
/// single `Runner` can be used from many rayon workers at once.
#[derive(Debug, Clone, Default)]
pub struct Runner;

impl Runner {
    pub fn new() -> Self {
        Self
    }

    /// Run one simulation and summarize it.
    pub fn run(&self, matrix: &BarMatrix, config: &RunConfig) -> Result<BacktestResult, RunError> {
        let result = run_simulation(matrix, config)?;
        let summary = BacktestResult::from_run(config, result);
        info!(
            run_id = summary.run_id.as_str(),
            final_equity = summary.final_equity,
            trades = summary.trade_count,
            "run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use portlab_core::config::MacroFilterType;
    use portlab_core::data::AssetSeries;
    use portlab_core::domain::MarketBar;

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::hours(i as i64)
    }

    fn make_matrix() -> BarMatrix {
        let closes = [100.0, 103.0, 104.0, 102.0, 106.0, 105.0];
        let bars: Vec<MarketBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| MarketBar {
                timestamp: ts(i),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                atr: 2.0,
                htf_metric: 0.7,
                ltf_metric: 65.0,
            })
            .collect();
        BarMatrix::new((0..6).map(ts).collect(), vec![AssetSeries::new("A", bars)]).unwrap()
    }

    fn test_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.macro_filter_type = MacroFilterType::Hurst;
        config.momentum_lookback = 1;
        config
    }

    #[test]
    fn run_produces_summary_with_run_id() {
        let runner = Runner::new();
        let result = runner.run(&make_matrix(), &test_config()).unwrap();
        assert_eq!(result.run_id, test_config().run_id());
        assert_eq!(result.trade_count, result.trades.len());
        assert_eq!(result.bar_count, 6);
        assert!(result.final_equity.is_finite());
    }

    #[test]
    fn total_return_matches_equity_change() {
        let runner = Runner::new();
        let result = runner.run(&make_matrix(), &test_config()).unwrap();
        let expected = (result.final_equity - result.config.initial_capital)
            / result.config.initial_capital;
        assert!((result.total_return - expected).abs() < 1e-12);
    }

    #[test]
    fn invalid_config_surfaces_as_run_error() {
        let mut config = test_config();
        config.risk_per_trade = 2.0;
        let runner = Runner::new();
        assert!(matches!(
            runner.run(&make_matrix(), &config),
            Err(RunError::Sim(_))
        ));
    }

    #[test]
    fn result_serializes_for_downstream_consumers() {
        let runner = Runner::new();
        let result = runner.run(&make_matrix(), &test_config()).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let deser: BacktestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.run_id, result.run_id);
        assert_eq!(deser.equity_curve, result.equity_curve);
    }
}
