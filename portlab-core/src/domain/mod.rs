//! Domain types for the portfolio simulator.

pub mod bar;
pub mod portfolio;
pub mod position;
pub mod trade;

pub use bar::MarketBar;
pub use portfolio::PortfolioState;
pub use position::{AssetState, PositionSide};
pub use trade::{ExitReason, Trade};

/// Symbol type alias
pub type Symbol = String;
