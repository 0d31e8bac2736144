//! Parameter sweep utilities for grid search over risk/exit parameters.
//!
//! Each grid point is an independent run: no shared mutable state, results
//! collected per worker and merged afterwards. Cancellation of one run
//! (panic, abort) cannot corrupt another — every run owns its state.

use anyhow::Result;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

use portlab_core::config::RunConfig;
use portlab_core::data::BarMatrix;

use crate::runner::{BacktestResult, Runner};

/// Parameter grid specification.
///
/// Defines value lists for each swept parameter; the grid is their
/// cartesian product minus combinations that would fail validation.
#[derive(Debug, Clone)]
pub struct ParamGrid {
    /// Trailing stop multipliers to test
    pub trailing_atr_multipliers: Vec<f64>,

    /// Breakeven trigger thresholds to test
    pub breakeven_atr_thresholds: Vec<f64>,

    /// Per-trade risk fractions to test
    pub risk_fractions: Vec<f64>,

    /// HTF regime thresholds to test
    pub htf_thresholds: Vec<f64>,
}

impl ParamGrid {
    /// The default exit-parameter grid.
    ///
    /// Trailing multipliers: 1.5, 2.0, 2.5, 3.0
    /// Breakeven thresholds: 0.5, 1.0, 2.0
    pub fn exit_default() -> Self {
        Self {
            trailing_atr_multipliers: vec![1.5, 2.0, 2.5, 3.0],
            breakeven_atr_thresholds: vec![0.5, 1.0, 2.0],
            risk_fractions: vec![0.02],
            htf_thresholds: vec![0.6],
        }
    }

    /// Returns the total number of grid points before validity filtering.
    pub fn size(&self) -> usize {
        self.trailing_atr_multipliers.len()
            * self.breakeven_atr_thresholds.len()
            * self.risk_fractions.len()
            * self.htf_thresholds.len()
    }

    /// Generates all valid configurations in the grid.
    ///
    /// Combinations where the breakeven threshold is not strictly below the
    /// trailing multiplier are skipped — they could never pass validation.
    pub fn generate_configs(&self, base_config: &RunConfig) -> Vec<RunConfig> {
        let mut configs = Vec::new();

        for &trailing in &self.trailing_atr_multipliers {
            for &breakeven in &self.breakeven_atr_thresholds {
                if breakeven >= trailing {
                    continue;
                }

                for &risk in &self.risk_fractions {
                    for &htf in &self.htf_thresholds {
                        let mut config = base_config.clone();
                        config.trailing_atr_multiplier = trailing;
                        config.breakeven_atr_threshold = breakeven;
                        config.risk_per_trade = risk;
                        config.htf_threshold = htf;
                        configs.push(config);
                    }
                }
            }
        }

        configs
    }
}

/// Parameter sweep executor.
///
/// Runs a simulation for every grid point, in parallel by default.
pub struct ParamSweep {
    runner: Runner,
    parallel: bool,
}

impl ParamSweep {
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Executes a sweep over the grid against one shared, read-only matrix.
    pub fn sweep(
        &self,
        matrix: &BarMatrix,
        grid: &ParamGrid,
        base_config: &RunConfig,
    ) -> Result<SweepResults> {
        let configs = grid.generate_configs(base_config);
        info!(
            points = configs.len(),
            parallel = self.parallel,
            "parameter sweep starting"
        );

        let results: Vec<BacktestResult> = if self.parallel {
            configs
                .par_iter()
                .map(|config| self.runner.run(matrix, config))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            configs
                .iter()
                .map(|config| self.runner.run(matrix, config))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(SweepResults::new(results))
    }
}

/// Merged results from a parameter sweep.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Gets a result by run id.
    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results sorted by total return (descending).
    pub fn sorted_by_return(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| {
            b.total_return
                .partial_cmp(&a.total_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// The top N results by total return.
    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.sorted_by_return().into_iter().take(n).collect()
    }

    /// The best result by total return.
    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_return().into_iter().next()
    }
}
