//! Bar-by-bar portfolio simulation — the heart of the engine.
//!
//! Time-first loop: every phase runs across all assets before the clock
//! advances. Exits always run before entries on the same bar so freed slots
//! and exposure can be redeployed immediately. The inner dimension is a
//! full per-bar candidate set resolved through ranking before any admission
//! decision, never a fixed asset iteration order.

use tracing::{info, warn};

use crate::components::gate::atr_zscore;
use crate::components::{floored_atr, momentum_score, size_position};
use crate::components::{EntryGate, ExitDecision, ExitManager};
use crate::config::RunConfig;
use crate::data::BarMatrix;
use crate::domain::{ExitReason, PositionSide, Trade};
use crate::error::SimError;

use super::state::{RunResult, SimState};

/// Relative slack for the exposure budget comparison, scaled by equity.
const EXPOSURE_EPS: f64 = 1e-9;

/// A per-bar entry candidate: asset index, rank score, direction.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    asset: usize,
    score: f64,
    side: PositionSide,
}

/// Run a full simulation over aligned multi-asset bars.
///
/// Validates the configuration first (fatal before any bar), excludes
/// assets with insufficient history (noted in the result, not fatal), then
/// drives the per-bar phases:
///
/// 1. exits for all open positions,
/// 2. entry gate for all flat assets (volatility veto resolved first,
///    system-wide),
/// 3. ranking and admission under slot and exposure budgets, sizing each
///    admitted trade,
/// 4. one equity-curve point (realized cash + mark-to-market).
///
/// The run is strictly sequential; this ordering is part of the contract.
pub fn run_simulation(matrix: &BarMatrix, config: &RunConfig) -> Result<RunResult, SimError> {
    config.validate()?;

    let num_bars = matrix.num_bars();
    let num_assets = matrix.num_assets();
    let mut state = SimState::new(num_assets, num_bars, config.initial_capital);

    // EmptyHistory policy: an asset that cannot produce a single momentum
    // score is excluded up front rather than failing the run.
    let min_history = config.momentum_lookback + 1;
    for (i, asset) in matrix.assets.iter().enumerate() {
        if asset.valid_bar_count() < min_history {
            state.skipped[i] = true;
            warn!(
                symbol = asset.symbol.as_str(),
                bars = asset.valid_bar_count(),
                required = min_history,
                "asset skipped for insufficient history"
            );
        }
    }

    let gate = EntryGate::from_config(config);
    let exits = ExitManager::from_config(config);

    for t in 0..num_bars {
        let timestamp = matrix.timestamps[t];

        // ─── Phase 0: refresh marks ───
        for i in 0..num_assets {
            let bar = matrix.bar(i, t);
            if !bar.is_void() {
                state.last_valid_close[i] = bar.close;
            }
        }

        // ─── Phase 1: exits ───
        // Open positions are evaluated on every bar, vetoed or not.
        for i in 0..num_assets {
            if state.asset_states[i].is_flat() {
                continue;
            }
            let bar = matrix.bar(i, t);
            if bar.is_void() {
                continue; // carry the position; nothing to evaluate
            }

            let decision = exits.on_bar(&matrix.assets[i].symbol, &mut state.asset_states[i], bar);
            if let ExitDecision::Close { price, reason } = decision {
                close_position(&mut state, matrix, i, t, timestamp, price, reason);
            }
        }

        // ─── Phase 2: volatility veto + entry gate ───
        let veto_active = (0..num_assets).any(|i| {
            !state.skipped[i]
                && atr_zscore(&matrix.assets[i].bars, t, config.vol_zscore_lookback)
                    > config.veto_threshold
        });
        if veto_active {
            state.vetoed_bars += 1;
            warn!(bar = t, "volatility veto active: no new entries this bar");
        }

        let mut candidates: Vec<Candidate> = Vec::new();
        for i in 0..num_assets {
            if state.skipped[i] {
                continue;
            }
            let bar = matrix.bar(i, t);
            if bar.is_void() {
                continue;
            }
            if !gate.is_candidate(bar, &state.asset_states[i], veto_active) {
                continue;
            }

            let score = momentum_score(&matrix.assets[i].bars, t, config.momentum_lookback);
            // Zero is the neutral, non-competitive score — it never trades.
            let side = if score > 0.0 {
                PositionSide::Long
            } else if score < 0.0 {
                PositionSide::Short
            } else {
                continue;
            };
            candidates.push(Candidate {
                asset: i,
                score,
                side,
            });
        }

        // ─── Phase 3: rank and admit ───
        // Descending score; exact ties break by ascending asset index (an
        // explicit convention, not a meaningful ordering).
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.asset.cmp(&b.asset))
        });

        let equity = state.portfolio.equity(state.unrealized_pnl());
        let exposure_cap = config.max_portfolio_exposure * equity;

        for candidate in &candidates {
            // A candidate that does not fit is skipped, not a hard stop:
            // a cheaper one further down the list may still fit.
            if state.portfolio.open_positions >= config.max_concurrent_trades {
                continue;
            }

            let bar = matrix.bar(candidate.asset, t);
            let sizing = match size_position(
                equity,
                config.risk_per_trade,
                bar.close,
                bar.atr,
                config.trailing_atr_multiplier,
                candidate.side,
            ) {
                Some(s) => s,
                None => continue,
            };

            if state.portfolio.exposure + sizing.risk_amount
                > exposure_cap + EXPOSURE_EPS * equity.abs()
            {
                continue;
            }

            let entry_atr = floored_atr(bar.atr, bar.close);
            state.asset_states[candidate.asset].open(
                candidate.side,
                bar.close,
                timestamp,
                t,
                sizing.quantity,
                sizing.initial_stop,
                entry_atr,
                sizing.risk_amount,
            );
            state.portfolio.admit(sizing.risk_amount);
            info!(
                symbol = matrix.assets[candidate.asset].symbol.as_str(),
                side = ?candidate.side,
                score = candidate.score,
                price = bar.close,
                quantity = sizing.quantity,
                stop = sizing.initial_stop,
                "position opened"
            );
        }

        // ─── Phase 3b: end of data ───
        if t + 1 == num_bars {
            for i in 0..num_assets {
                if state.asset_states[i].is_flat() {
                    continue;
                }
                let close = state.last_valid_close[i];
                let price = if close.is_finite() {
                    close
                } else {
                    state.asset_states[i].entry_price
                };
                close_position(&mut state, matrix, i, t, timestamp, price, ExitReason::EndOfData);
            }
        }

        // ─── Phase 4: equity accounting ───
        let equity_point = state.portfolio.equity(state.unrealized_pnl());
        state.equity_curve.push(equity_point);
    }

    let final_equity = state
        .equity_curve
        .last()
        .copied()
        .unwrap_or(config.initial_capital);

    let skipped_assets = matrix
        .assets
        .iter()
        .zip(&state.skipped)
        .filter(|(_, &skipped)| skipped)
        .map(|(asset, _)| asset.symbol.clone())
        .collect();

    Ok(RunResult {
        trades: state.trades,
        equity_curve: state.equity_curve,
        final_equity,
        initial_capital: config.initial_capital,
        bar_count: num_bars,
        skipped_assets,
        vetoed_bars: state.vetoed_bars,
    })
}

/// Record the trade, release the slot and exposure, flatten the asset.
fn close_position(
    state: &mut SimState,
    matrix: &BarMatrix,
    asset: usize,
    t: usize,
    timestamp: chrono::NaiveDateTime,
    price: f64,
    reason: ExitReason,
) {
    let asset_state = &state.asset_states[asset];
    let pnl = asset_state.unrealized_pnl(price);
    let trade = Trade {
        symbol: matrix.assets[asset].symbol.clone(),
        side: asset_state.side,
        entry_bar: asset_state.entry_bar,
        entry_time: asset_state.entry_time.unwrap_or(timestamp),
        entry_price: asset_state.entry_price,
        exit_bar: t,
        exit_time: timestamp,
        exit_price: price,
        quantity: asset_state.quantity,
        pnl,
        exit_reason: reason,
    };
    info!(
        symbol = trade.symbol.as_str(),
        side = ?trade.side,
        pnl = trade.pnl,
        reason = ?reason,
        "position closed"
    );

    let risk_amount = asset_state.risk_amount;
    state.trades.push(trade);
    state.portfolio.release(risk_amount, pnl);
    state.asset_states[asset].close();
}
