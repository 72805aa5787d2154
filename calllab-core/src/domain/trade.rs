//! TradeExecution: a completed call position, plus skip records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a call's simulated position ended (or why it never opened).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TimeExit,
    NoEntry,
    InsufficientCapital,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TakeProfit => "take_profit",
            Self::StopLoss => "stop_loss",
            Self::TimeExit => "time_exit",
            Self::NoEntry => "no_entry",
            Self::InsufficientCapital => "insufficient_capital",
        }
    }

    /// True for the two reasons recorded on skipped calls.
    pub fn is_skip(self) -> bool {
        matches!(self, Self::NoEntry | Self::InsufficientCapital)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a call did not produce a position. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No usable entry candle, or every position slot was taken.
    NoEntry,
    /// The sizer produced a size below the executable minimum.
    InsufficientCapital,
}

impl From<SkipReason> for ExitReason {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::NoEntry => ExitReason::NoEntry,
            SkipReason::InsufficientCapital => ExitReason::InsufficientCapital,
        }
    }
}

/// A completed trade, appended once when its exit event is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecution {
    pub call_id: String,
    pub caller: String,
    pub entry_ts_ms: i64,
    pub exit_ts_ms: i64,
    pub entry_px: f64,
    pub exit_px: f64,
    /// Capital committed at entry.
    pub size: f64,
    /// Net of the fee/slippage haircut.
    pub pnl: f64,
    /// Gross exit multiple of entry price.
    pub exit_mult: f64,
    pub exit_reason: ExitReason,
}

impl TradeExecution {
    /// Return on committed capital.
    pub fn return_pct(&self) -> f64 {
        if self.size == 0.0 {
            return 0.0;
        }
        self.pnl / self.size
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn holding_ms(&self) -> i64 {
        self.exit_ts_ms - self.entry_ts_ms
    }
}

/// A call that was recorded as skipped rather than executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTrade {
    pub call_id: String,
    pub caller: String,
    pub ts_ms: i64,
    pub reason: SkipReason,
}

impl SkippedTrade {
    pub fn exit_reason(&self) -> ExitReason {
        self.reason.into()
    }
}
