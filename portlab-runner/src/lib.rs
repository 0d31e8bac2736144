//! PortLab Runner — orchestration on top of `portlab-core`.
//!
//! - TOML strategy configuration loading
//! - Single-run execution with content-addressable run ids
//! - Parallel parameter sweeps over independent runs (rayon)

pub mod config;
pub mod runner;
pub mod sweep;

pub use config::{load_run_config, parse_run_config, ConfigFileError};
pub use runner::{BacktestResult, RunError, Runner};
pub use sweep::{ParamGrid, ParamSweep, SweepResults};
