//! PortLab Core — multi-asset portfolio simulation under scarce capital.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (bars, per-asset position state, portfolio state, trades)
//! - Aligned multi-asset input model with index-length checks
//! - Rank scorer (volatility-normalized momentum, NaN scrubbing at the boundary)
//! - Entry gate (macro regime filter + volatility veto + single-position rule)
//! - Volatility-risk position sizer
//! - Exit manager (breakeven-then-trail state machine, monotonic stop ratchet)
//! - The time-first simulation loop producing a trade ledger and equity curve
//!
//! A single run is strictly sequential; independent runs share no mutable
//! state and parallelize freely (see `portlab-runner`).

pub mod components;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::{MacroFilterType, RunConfig, StopFillPolicy};
pub use data::{AssetSeries, BarMatrix};
pub use engine::{run_simulation, RunResult};
pub use error::{AlignmentError, ConfigError, SimError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: result and domain types cross thread boundaries.
    ///
    /// Sweeps fan runs out across rayon workers; if any of these types stops
    /// being Send + Sync, the build breaks here first.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::MarketBar>();
        require_sync::<domain::MarketBar>();
        require_send::<domain::AssetState>();
        require_sync::<domain::AssetState>();
        require_send::<domain::PortfolioState>();
        require_sync::<domain::PortfolioState>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();

        require_send::<RunConfig>();
        require_sync::<RunConfig>();
        require_send::<BarMatrix>();
        require_sync::<BarMatrix>();
        require_send::<RunResult>();
        require_sync::<RunResult>();
        require_send::<SimError>();
        require_sync::<SimError>();
    }
}
