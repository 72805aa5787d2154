//! Position sizer: capital state + config → trade size or skip reason.
//!
//! The size is the smallest of three budgets:
//! - risk budget: `max_risk_per_trade / (1 - sl_mult)`, so a stop-out loses at
//!   most `max_risk_per_trade`
//! - allocation budget: `max_allocation_pct * free_cash`
//! - free cash itself
//!
//! Sizes below `min_executable_size` are skipped as `insufficient_capital`.

use serde::{Deserialize, Serialize};

use crate::config::SimulatorConfig;
use crate::domain::{Params, SkipReason};
use crate::ledger::CapitalState;

/// Outcome of sizing a single call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SizeDecision {
    Size(f64),
    Skip(SkipReason),
}

/// Size a new position. Pure and deterministic.
pub fn compute_size(state: &CapitalState, config: &SimulatorConfig, params: &Params) -> SizeDecision {
    let free_cash = state.free_cash();
    let stop_fraction = params.stop_fraction();

    let size_risk = if stop_fraction > 0.0 {
        config.max_risk_per_trade / stop_fraction
    } else {
        0.0
    };
    let size_alloc = config.max_allocation_pct * free_cash;
    let size = size_risk.min(size_alloc).min(free_cash);

    if !size.is_finite() || size <= 0.0 || size < config.min_executable_size {
        return SizeDecision::Skip(SkipReason::InsufficientCapital);
    }
    SizeDecision::Size(size)
}
