//! Strategy TOML loading.
//!
//! Maps a strategy file with `[backtest]`, `[risk]`, `[filters]` and
//! `[signals]` tables onto a validated `RunConfig`. Every field is
//! optional in the file and falls back to the engine default; an unknown
//! filter type or an out-of-range value is a fatal error raised before any
//! run starts.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use portlab_core::config::{MacroFilterType, RunConfig, StopFillPolicy};
use portlab_core::error::ConfigError;

/// Errors from loading a strategy file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed strategy file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StrategyFile {
    backtest: BacktestTable,
    risk: RiskTable,
    filters: FiltersTable,
    signals: SignalsTable,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct BacktestTable {
    initial_capital: Option<f64>,
    stop_fill: Option<StopFillPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RiskTable {
    risk_per_trade: Option<f64>,
    trailing_atr_multiplier: Option<f64>,
    breakeven_atr_threshold: Option<f64>,
    max_portfolio_exposure: Option<f64>,
    max_concurrent_trades: Option<usize>,
    fee_margin_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FiltersTable {
    macro_filter_type: Option<MacroFilterType>,
    htf_threshold: Option<f64>,
    ltf_threshold: Option<f64>,
    veto_threshold: Option<f64>,
    vol_zscore_lookback: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SignalsTable {
    momentum_lookback: Option<usize>,
}

impl StrategyFile {
    fn into_run_config(self) -> RunConfig {
        let mut config = RunConfig::default();
        let Self {
            backtest,
            risk,
            filters,
            signals,
        } = self;

        if let Some(v) = backtest.initial_capital {
            config.initial_capital = v;
        }
        if let Some(v) = backtest.stop_fill {
            config.stop_fill = v;
        }
        if let Some(v) = risk.risk_per_trade {
            config.risk_per_trade = v;
        }
        if let Some(v) = risk.trailing_atr_multiplier {
            config.trailing_atr_multiplier = v;
        }
        if let Some(v) = risk.breakeven_atr_threshold {
            config.breakeven_atr_threshold = v;
        }
        if let Some(v) = risk.max_portfolio_exposure {
            config.max_portfolio_exposure = v;
        }
        if let Some(v) = risk.max_concurrent_trades {
            config.max_concurrent_trades = v;
        }
        if let Some(v) = risk.fee_margin_pct {
            config.fee_margin_pct = v;
        }
        if let Some(v) = filters.macro_filter_type {
            config.macro_filter_type = v;
        }
        if let Some(v) = filters.htf_threshold {
            config.htf_threshold = v;
        }
        if let Some(v) = filters.ltf_threshold {
            config.ltf_threshold = v;
        }
        if let Some(v) = filters.veto_threshold {
            config.veto_threshold = v;
        }
        if let Some(v) = filters.vol_zscore_lookback {
            config.vol_zscore_lookback = v;
        }
        if let Some(v) = signals.momentum_lookback {
            config.momentum_lookback = v;
        }

        config
    }
}

/// Parse a strategy TOML string into a validated `RunConfig`.
pub fn parse_run_config(toml_str: &str) -> Result<RunConfig, ConfigFileError> {
    let file: StrategyFile = toml::from_str(toml_str)?;
    let config = file.into_run_config();
    config.validate()?;
    Ok(config)
}

/// Load and validate a strategy TOML file.
pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig, ConfigFileError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_run_config(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_run_config("").unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn tables_override_defaults() {
        let config = parse_run_config(
            r#"
            [backtest]
            initial_capital = 10000.0

            [risk]
            risk_per_trade = 0.01
            max_concurrent_trades = 5

            [filters]
            macro_filter_type = "hurst"
            htf_threshold = 0.65

            [signals]
            momentum_lookback = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.initial_capital, 10_000.0);
        assert_eq!(config.risk_per_trade, 0.01);
        assert_eq!(config.max_concurrent_trades, 5);
        assert_eq!(config.macro_filter_type, MacroFilterType::Hurst);
        assert_eq!(config.htf_threshold, 0.65);
        assert_eq!(config.momentum_lookback, 30);
        // Untouched fields keep their defaults.
        assert_eq!(config.trailing_atr_multiplier, 3.0);
    }

    #[test]
    fn unknown_filter_type_is_fatal() {
        let result = parse_run_config(
            r#"
            [filters]
            macro_filter_type = "momentum"
            "#,
        );
        assert!(matches!(result, Err(ConfigFileError::Parse(_))));
    }

    #[test]
    fn unknown_key_is_fatal() {
        let result = parse_run_config(
            r#"
            [risk]
            risk_pct = 0.02
            "#,
        );
        assert!(matches!(result, Err(ConfigFileError::Parse(_))));
    }

    #[test]
    fn invalid_range_is_fatal() {
        let result = parse_run_config(
            r#"
            [risk]
            breakeven_atr_threshold = 4.0
            trailing_atr_multiplier = 3.0
            "#,
        );
        assert!(matches!(result, Err(ConfigFileError::Invalid(_))));
    }

    #[test]
    fn stop_fill_policy_parses() {
        let config = parse_run_config(
            r#"
            [backtest]
            stop_fill = "gap_aware"
            "#,
        )
        .unwrap();
        assert_eq!(config.stop_fill, StopFillPolicy::GapAware);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_run_config("/nonexistent/strategy.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/strategy.toml"));
    }
}
