//! Trade lifecycle: resolves one call's exit from its candle path.
//!
//! States: `PendingEntry → Open → {ClosedTp, ClosedSl, ClosedTime}` or
//! `PendingEntry → Skipped` when no entry candle exists.
//!
//! Per candle, in order:
//! 1. `ts >= deadline` closes as a time exit at the candle's close
//! 2. `high >= tp_px` / `low <= sl_px` close at the threshold multiple; when
//!    both are touched the intrabar policy decides
//!
//! A path that runs out first closes as a time exit at the final close.
//!
//! The outcome depends only on entry price, params, horizon, policies and the
//! path. Position size never enters, which lets the ledger resolve every path
//! once and replay capital effects afterwards.

pub mod entry;
pub mod path_policy;

pub use entry::{find_entry, Entry};
pub use path_policy::resolve_touch;

use serde::{Deserialize, Serialize};

use crate::config::{IntrabarPolicy, SimulatorConfig};
use crate::domain::{hours_to_ms, Call, Candle, ExitReason, Params, SkipReason};

/// Lifecycle state of a single call's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    PendingEntry,
    Open,
    ClosedTp,
    ClosedSl,
    ClosedTime,
    Skipped,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::PendingEntry | Self::Open)
    }
}

/// A fully resolved exit, independent of position size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTrade {
    pub entry_ts_ms: i64,
    pub entry_px: f64,
    pub tp_px: f64,
    pub sl_px: f64,
    pub deadline_ts_ms: i64,
    pub exit_ts_ms: i64,
    pub exit_px: f64,
    /// Gross exit multiple of entry price.
    pub exit_mult: f64,
    pub exit_reason: ExitReason,
}

impl ResolvedTrade {
    /// Exit multiple after the proceeds haircut.
    pub fn net_mult(&self, haircut: f64) -> f64 {
        self.exit_mult * (1.0 - haircut)
    }

    /// PnL for a position of `size` committed at entry.
    pub fn pnl(&self, size: f64, haircut: f64) -> f64 {
        size * (self.net_mult(haircut) - 1.0)
    }
}

/// Result of running one call through the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Closed(ResolvedTrade),
    Skipped(SkipReason),
}

impl TradeOutcome {
    pub fn state(&self) -> LifecycleState {
        match self {
            Self::Skipped(_) => LifecycleState::Skipped,
            Self::Closed(t) => match t.exit_reason {
                ExitReason::TakeProfit => LifecycleState::ClosedTp,
                ExitReason::StopLoss => LifecycleState::ClosedSl,
                _ => LifecycleState::ClosedTime,
            },
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedTrade> {
        match self {
            Self::Closed(t) => Some(t),
            Self::Skipped(_) => None,
        }
    }
}

/// Incremental state machine for one position.
///
/// [`resolve_trade`] drives it over a whole path; it can also be stepped a
/// candle at a time when paths arrive incrementally.
#[derive(Debug, Clone)]
pub struct TradeLifecycle {
    state: LifecycleState,
    params: Params,
    intrabar: IntrabarPolicy,
    hold_ms: i64,
    entry_ts_ms: i64,
    entry_px: f64,
    tp_px: f64,
    sl_px: f64,
    deadline_ts_ms: i64,
    exit: Option<ResolvedTrade>,
}

impl TradeLifecycle {
    pub fn new(params: Params, config: &SimulatorConfig) -> Self {
        let hold_hrs = params.max_hold_hrs.min(config.max_trade_horizon_hrs);
        Self {
            state: LifecycleState::PendingEntry,
            params,
            intrabar: config.intrabar_policy,
            hold_ms: hours_to_ms(hold_hrs),
            entry_ts_ms: 0,
            entry_px: 0.0,
            tp_px: 0.0,
            sl_px: 0.0,
            deadline_ts_ms: 0,
            exit: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn exit(&self) -> Option<&ResolvedTrade> {
        self.exit.as_ref()
    }

    /// PendingEntry → Open.
    pub fn open(&mut self, entry_ts_ms: i64, entry_px: f64) {
        if self.state != LifecycleState::PendingEntry {
            return;
        }
        self.entry_ts_ms = entry_ts_ms;
        self.entry_px = entry_px;
        self.tp_px = entry_px * self.params.tp_mult;
        self.sl_px = entry_px * self.params.sl_mult;
        self.deadline_ts_ms = entry_ts_ms.saturating_add(self.hold_ms);
        self.state = LifecycleState::Open;
    }

    /// PendingEntry → Skipped.
    pub fn skip(&mut self) {
        if self.state == LifecycleState::PendingEntry {
            self.state = LifecycleState::Skipped;
        }
    }

    /// Evaluate one candle while Open. Returns the exit if this candle closes
    /// the position; no-op in any other state.
    pub fn on_candle(&mut self, candle: &Candle) -> Option<ResolvedTrade> {
        if self.state != LifecycleState::Open {
            return None;
        }

        if candle.ts_ms >= self.deadline_ts_ms {
            return Some(self.close_at_market(candle));
        }

        let touched_tp = candle.high >= self.tp_px;
        let touched_sl = candle.low <= self.sl_px;
        let reason = resolve_touch(self.intrabar, candle, touched_tp, touched_sl)?;
        let exit_mult = match reason {
            ExitReason::TakeProfit => self.params.tp_mult,
            _ => self.params.sl_mult,
        };
        Some(self.close(candle.ts_ms, exit_mult, reason))
    }

    /// Close at `candle`'s close as a time exit (end-of-path fallback).
    pub fn force_close(&mut self, candle: &Candle) -> Option<ResolvedTrade> {
        if self.state != LifecycleState::Open {
            return None;
        }
        Some(self.close_at_market(candle))
    }

    fn close_at_market(&mut self, candle: &Candle) -> ResolvedTrade {
        let exit_mult = candle.close / self.entry_px;
        self.close(candle.ts_ms, exit_mult, ExitReason::TimeExit)
    }

    fn close(&mut self, exit_ts_ms: i64, exit_mult: f64, reason: ExitReason) -> ResolvedTrade {
        let trade = ResolvedTrade {
            entry_ts_ms: self.entry_ts_ms,
            entry_px: self.entry_px,
            tp_px: self.tp_px,
            sl_px: self.sl_px,
            deadline_ts_ms: self.deadline_ts_ms,
            exit_ts_ms,
            exit_px: self.entry_px * exit_mult,
            exit_mult,
            exit_reason: reason,
        };
        self.state = match reason {
            ExitReason::TakeProfit => LifecycleState::ClosedTp,
            ExitReason::StopLoss => LifecycleState::ClosedSl,
            _ => LifecycleState::ClosedTime,
        };
        self.exit = Some(trade);
        trade
    }
}

/// Resolve a call's full exit outcome from its candle path.
///
/// `path` must already be validated (non-empty, time-ordered).
pub fn resolve_trade(
    call: &Call,
    path: &[Candle],
    params: &Params,
    config: &SimulatorConfig,
) -> TradeOutcome {
    let mut lifecycle = TradeLifecycle::new(*params, config);

    let Some(entry) = find_entry(call.ts_ms, path, config.entry_policy) else {
        lifecycle.skip();
        return TradeOutcome::Skipped(SkipReason::NoEntry);
    };
    lifecycle.open(entry.ts_ms, entry.price);

    for candle in path.iter().skip(entry.scan_from) {
        if let Some(trade) = lifecycle.on_candle(candle) {
            return TradeOutcome::Closed(trade);
        }
    }

    // Never touched TP/SL/deadline: close at the last observed price.
    match path.last().and_then(|last| lifecycle.force_close(last)) {
        Some(trade) => TradeOutcome::Closed(trade),
        None => TradeOutcome::Skipped(SkipReason::NoEntry),
    }
}
