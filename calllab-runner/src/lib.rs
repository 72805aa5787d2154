//! CallLab Runner — grid search, per-caller optimization, grouped evaluation.
//!
//! This crate builds on `calllab-core` to provide:
//! - Exhaustive `(tp, sl, hold)` grid search with a stable argmax,
//!   rayon-parallel combinations and cooperative cancellation
//! - Per-caller optimization with collapsed-capital and extreme-param flags
//! - Caller filtering and a pooled re-run with averaged params
//! - TOML runner configuration and JSON input loading

pub mod config;
pub mod grouped;
pub mod per_caller;
pub mod sweep;

pub use config::{load_inputs, ConfigError, FilterSettings, RunnerConfig, SearchSettings};
pub use grouped::{run_grouped_evaluation, CallerFilter, GroupedHold, GroupedResult};
pub use per_caller::{optimize_per_caller, partition_by_caller, ExtremeThresholds, PerCallerResult};
pub use sweep::{
    optimize, CancelFlag, GridSearch, OptimizationResult, OptimizeError, ParamGrid,
    ParamRunSummary, RunFailure, SearchStatus,
};
