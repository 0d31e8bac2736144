//! Input data model.

pub mod series;

pub use series::{AssetSeries, BarMatrix};
