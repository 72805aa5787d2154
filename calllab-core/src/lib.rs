//! CallLab Core — call-driven backtesting under finite capital.
//!
//! This crate contains the per-run engine:
//! - Domain types (calls, candles, params, trade executions, skip records)
//! - Position sizer: capital state + config → size or skip reason
//! - Trade lifecycle: size-independent TP/SL/time exit resolution
//! - Capital ledger: chronological admission control and cash accounting
//! - Fail-fast input validation and input fingerprinting
//!
//! The core performs no I/O and never reads the clock or an RNG: identical
//! inputs always produce bit-identical results.

pub mod config;
pub mod domain;
pub mod fingerprint;
pub mod ledger;
pub mod lifecycle;
pub mod sizer;
pub mod validation;

pub use config::{EntryPricePolicy, IntrabarPolicy, SimulatorConfig};
pub use domain::{
    Call, Candle, CandlesByCallId, ExitReason, Params, SkipReason, SkippedTrade, TradeExecution,
};
pub use fingerprint::InputFingerprint;
pub use ledger::{
    simulate, simulate_unchecked, CapitalLedger, CapitalSimulationResult, CapitalState,
    SimulationError,
};
pub use lifecycle::{resolve_trade, LifecycleState, ResolvedTrade, TradeOutcome};
pub use sizer::{compute_size, SizeDecision};
pub use validation::{validate_inputs, validate_params, ValidationError};
