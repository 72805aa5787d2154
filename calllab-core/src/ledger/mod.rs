//! Capital ledger: replays calls in time order under finite capital.
//!
//! Two phases:
//! 1. Resolve every call's exit from its candle path (size-independent).
//! 2. Replay the merged stream of call arrivals and resolved exits, applying
//!    admission control and cash movements in timestamp order.
//!
//! Exits due at or before an arrival's timestamp settle before that arrival,
//! so capital released at `t` is available to calls at `t`.

pub mod events;
pub mod state;

pub use events::{EventScheduler, ExitEvent};
pub use state::{CapitalState, Position};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::SimulatorConfig;
use crate::domain::{
    fmt_ts_ms, sort_chronologically, Call, CandlesByCallId, Params, SkipReason, SkippedTrade,
    TradeExecution,
};
use crate::lifecycle::{resolve_trade, ResolvedTrade, TradeOutcome};
use crate::sizer::{compute_size, SizeDecision};
use crate::validation::{validate_inputs, validate_params, ValidationError};

/// Errors that prevent a run from starting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Outcome of one ledger run for one parameter combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalSimulationResult {
    pub params: Params,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub trades_executed: usize,
    pub trades_skipped: usize,
    pub realized_pnl: f64,
    /// Highest number of simultaneously open positions observed.
    pub peak_open_positions: usize,
    /// In the order their exits settled.
    pub completed_trades: Vec<TradeExecution>,
    pub skipped_trades: Vec<SkippedTrade>,
}

/// Open position plus its already-resolved exit.
#[derive(Debug)]
struct PendingExit {
    resolved: ResolvedTrade,
    size: f64,
}

/// Admission control and cash book for one run. Single writer, time order.
#[derive(Debug)]
pub struct CapitalLedger<'a> {
    config: &'a SimulatorConfig,
    params: Params,
    haircut: f64,
    state: CapitalState,
    scheduler: EventScheduler,
    pending: HashMap<u64, PendingExit>,
    next_seq: u64,
    peak_open: usize,
    completed: Vec<TradeExecution>,
    skipped: Vec<SkippedTrade>,
}

impl<'a> CapitalLedger<'a> {
    pub fn new(config: &'a SimulatorConfig, params: Params) -> Self {
        Self {
            config,
            params,
            haircut: config.cost_haircut(),
            state: CapitalState::new(config.initial_capital),
            scheduler: EventScheduler::new(),
            pending: HashMap::new(),
            next_seq: 0,
            peak_open: 0,
            completed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn state(&self) -> &CapitalState {
        &self.state
    }

    /// Apply a call arrival whose path outcome is already resolved.
    ///
    /// Settles every exit due at or before `call.ts_ms` first.
    pub fn arrive(&mut self, call: &Call, outcome: &TradeOutcome) {
        self.settle_until(call.ts_ms);

        if self.state.open_count() >= self.config.max_concurrent_positions {
            self.skip(call, SkipReason::NoEntry);
            return;
        }

        let resolved = match outcome {
            TradeOutcome::Closed(resolved) => *resolved,
            TradeOutcome::Skipped(reason) => {
                self.skip(call, *reason);
                return;
            }
        };

        let size = match compute_size(&self.state, self.config, &self.params) {
            SizeDecision::Size(size) => size,
            SizeDecision::Skip(reason) => {
                self.skip(call, reason);
                return;
            }
        };

        let seq = self.next_seq;
        let position = Position {
            call_id: call.id.clone(),
            caller: call.caller.clone(),
            entry_ts_ms: resolved.entry_ts_ms,
            entry_px: resolved.entry_px,
            size,
            tp_px: resolved.tp_px,
            sl_px: resolved.sl_px,
            deadline_ts_ms: resolved.deadline_ts_ms,
        };
        if !self.state.commit(seq, position) {
            self.skip(call, SkipReason::InsufficientCapital);
            return;
        }
        self.next_seq += 1;
        self.scheduler.schedule(resolved.exit_ts_ms, seq);
        self.pending.insert(seq, PendingExit { resolved, size });
        self.peak_open = self.peak_open.max(self.state.open_count());
    }

    /// Settle every exit due at or before `ts_ms`.
    pub fn settle_until(&mut self, ts_ms: i64) {
        while let Some(event) = self.scheduler.pop_due(ts_ms) {
            self.settle(event);
        }
    }

    /// Settle all remaining exits and produce the run result.
    pub fn finish(mut self) -> CapitalSimulationResult {
        while let Some(event) = self.scheduler.pop_next() {
            self.settle(event);
        }

        let initial = self.config.initial_capital;
        let final_capital = self.state.free_cash();
        let total_return = if initial > 0.0 {
            (final_capital - initial) / initial
        } else {
            0.0
        };

        debug!(
            params = %self.params,
            final_capital,
            executed = self.completed.len(),
            skipped = self.skipped.len(),
            peak_open = self.peak_open,
            "ledger run complete"
        );

        CapitalSimulationResult {
            params: self.params,
            initial_capital: initial,
            final_capital,
            total_return,
            trades_executed: self.completed.len(),
            trades_skipped: self.skipped.len(),
            realized_pnl: self.state.realized_pnl(),
            peak_open_positions: self.peak_open,
            completed_trades: self.completed,
            skipped_trades: self.skipped,
        }
    }

    fn settle(&mut self, event: ExitEvent) {
        let Some(PendingExit { resolved, size }) = self.pending.remove(&event.seq) else {
            return;
        };
        let pnl = resolved.pnl(size, self.haircut);
        if let Some(position) = self.state.release(event.seq, pnl) {
            let trade = TradeExecution {
                call_id: position.call_id,
                caller: position.caller,
                entry_ts_ms: resolved.entry_ts_ms,
                exit_ts_ms: resolved.exit_ts_ms,
                entry_px: resolved.entry_px,
                exit_px: resolved.exit_px,
                size,
                pnl,
                exit_mult: resolved.exit_mult,
                exit_reason: resolved.exit_reason,
            };
            trace!(
                call_id = %trade.call_id,
                at = %fmt_ts_ms(trade.exit_ts_ms),
                reason = %trade.exit_reason,
                held_ms = trade.holding_ms(),
                return_pct = trade.return_pct(),
                "position closed"
            );
            self.completed.push(trade);
        }
    }

    fn skip(&mut self, call: &Call, reason: SkipReason) {
        trace!(
            call_id = %call.id,
            at = %fmt_ts_ms(call.ts_ms),
            ?reason,
            "call skipped"
        );
        self.skipped.push(SkippedTrade {
            call_id: call.id.clone(),
            caller: call.caller.clone(),
            ts_ms: call.ts_ms,
            reason,
        });
    }
}

/// Run one validated simulation over `calls` with fixed `params`.
pub fn simulate(
    calls: &[Call],
    candles: &CandlesByCallId,
    params: &Params,
    config: &SimulatorConfig,
) -> Result<CapitalSimulationResult, SimulationError> {
    validate_params(params)?;
    validate_inputs(calls, candles, config)?;
    Ok(simulate_unchecked(calls, candles, params, config))
}

/// [`simulate`] without validation, for callers that validated the inputs
/// once up front (the grid search runs many combinations on one input set).
///
/// A call without a candle path is recorded as `no_entry`.
pub fn simulate_unchecked(
    calls: &[Call],
    candles: &CandlesByCallId,
    params: &Params,
    config: &SimulatorConfig,
) -> CapitalSimulationResult {
    let ordered = sort_chronologically(calls);

    let outcomes: Vec<TradeOutcome> = ordered
        .iter()
        .map(|call| match candles.get(&call.id) {
            Some(path) => resolve_trade(call, path, params, config),
            None => TradeOutcome::Skipped(SkipReason::NoEntry),
        })
        .collect();

    let mut ledger = CapitalLedger::new(config, *params);
    for (call, outcome) in ordered.iter().zip(outcomes.iter()) {
        ledger.arrive(call, outcome);
    }
    ledger.finish()
}
