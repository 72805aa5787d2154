//! Domain types for CallLab

pub mod call;
pub mod candle;
pub mod params;
pub mod time;
pub mod trade;

pub use call::{sort_chronologically, Call};
pub use candle::{Candle, CandlesByCallId};
pub use params::Params;
pub use time::{fmt_ts_ms, hours_to_ms, MS_PER_HOUR};
pub use trade::{ExitReason, SkipReason, SkippedTrade, TradeExecution};
