//! Simulator configuration: capital limits, friction, and pluggable policies.

use serde::{Deserialize, Serialize};

/// How the entry candle and entry price are picked for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryPricePolicy {
    /// Open of the first candle at/after the alert. Exits are checked from
    /// that same candle.
    #[default]
    FirstOpen,
    /// Close of the first candle at/after the alert. Exits are checked from
    /// the following candle.
    FirstClose,
    /// Open of the first candle at/after `alert + delay_ms`.
    DelayedOpen { delay_ms: i64 },
}

/// Intrabar tie-break when a single candle touches both TP and SL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrabarPolicy {
    /// Pessimistic: the stop fills first.
    #[default]
    StopFirst,
    /// Optimistic: the target fills first.
    TakeProfitFirst,
    /// Infer the path from OHLC: open nearer the high visits the high first.
    OhlcPath,
}

/// Capital and execution settings shared by every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    /// Fraction of free cash a single position may take.
    pub max_allocation_pct: f64,
    /// Dollar loss allowed if the stop fills.
    pub max_risk_per_trade: f64,
    pub max_concurrent_positions: usize,
    /// Upper bound on any position's holding time, whatever the params say.
    pub max_trade_horizon_hrs: f64,
    pub min_executable_size: f64,
    pub taker_fee_bps: f64,
    pub slippage_bps: f64,
    pub intrabar_policy: IntrabarPolicy,
    pub entry_policy: EntryPricePolicy,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            max_allocation_pct: 0.04,
            max_risk_per_trade: 200.0,
            max_concurrent_positions: 25,
            max_trade_horizon_hrs: 48.0,
            min_executable_size: 10.0,
            taker_fee_bps: 30.0,
            slippage_bps: 10.0,
            intrabar_policy: IntrabarPolicy::StopFirst,
            entry_policy: EntryPricePolicy::FirstOpen,
        }
    }
}

impl SimulatorConfig {
    /// Total friction haircut applied to exit proceeds, as a fraction.
    pub fn cost_haircut(&self) -> f64 {
        (self.taker_fee_bps + self.slippage_bps) / 10_000.0
    }

    /// Same config with fees and slippage zeroed.
    pub fn frictionless(mut self) -> Self {
        self.taker_fee_bps = 0.0;
        self.slippage_bps = 0.0;
        self
    }
}
