//! The portfolio simulator: run state, orchestration loop, result types.

pub mod simulator;
pub mod state;

pub use simulator::run_simulation;
pub use state::{RunResult, SimState};
