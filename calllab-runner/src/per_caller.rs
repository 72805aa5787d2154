//! Per-caller optimization: one independent grid search per caller.
//!
//! Each caller's calls get their own capital pool starting at
//! `initial_capital`, so a caller's result never depends on anyone else's
//! calls. Outcomes are flagged when capital collapsed or when the winning
//! params sit at the edges of plausibility.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use calllab_core::validation::validate_config;
use calllab_core::{validate_inputs, Call, CandlesByCallId, InputFingerprint, Params, SimulatorConfig};

use crate::sweep::{GridSearch, OptimizationResult, OptimizeError, ParamGrid, SearchStatus};

/// Bounds beyond which best-fit params are considered unreliable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremeThresholds {
    /// A stop tighter than this (`sl_mult <` value) is extreme.
    pub sl_below: f64,
    /// A target further than this (`tp_mult >` value) is extreme.
    pub tp_above: f64,
}

impl Default for ExtremeThresholds {
    fn default() -> Self {
        Self {
            sl_below: 0.88,
            tp_above: 4.0,
        }
    }
}

impl ExtremeThresholds {
    pub fn is_extreme(&self, params: &Params) -> bool {
        params.sl_mult < self.sl_below || params.tp_mult > self.tp_above
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerCallerResult {
    pub caller: String,
    pub calls: usize,
    pub status: SearchStatus,
    pub best_params: Option<Params>,
    pub best_final_capital: f64,
    pub best_total_return: f64,
    pub best_trades_executed: usize,
    /// Share of the best run's trades that closed with positive PnL.
    pub best_win_rate: f64,
    /// Ending capital below the starting capital.
    pub collapsed_capital: bool,
    pub requires_extreme_params: bool,
    /// Identity of this caller's inputs; None when they were rejected.
    pub fingerprint: Option<InputFingerprint>,
    /// Why this caller's inputs were rejected. Its siblings still run.
    pub error: Option<String>,
}

impl PerCallerResult {
    fn from_search(
        caller: &str,
        calls: usize,
        search: OptimizationResult,
        config: &SimulatorConfig,
        thresholds: &ExtremeThresholds,
    ) -> Self {
        let (best_trades_executed, best_win_rate) =
            search.best_result.as_ref().map_or((0, 0.0), |r| {
                let winners = r.completed_trades.iter().filter(|t| t.is_winner()).count();
                let rate = if r.trades_executed > 0 {
                    winners as f64 / r.trades_executed as f64
                } else {
                    0.0
                };
                (r.trades_executed, rate)
            });
        Self {
            caller: caller.to_string(),
            calls,
            status: search.status,
            best_params: search.best_params,
            best_final_capital: search.best_final_capital,
            best_total_return: search.best_total_return(config.initial_capital),
            best_trades_executed,
            best_win_rate,
            collapsed_capital: search.best_final_capital < config.initial_capital,
            requires_extreme_params: search
                .best_params
                .as_ref()
                .is_some_and(|p| thresholds.is_extreme(p)),
            fingerprint: Some(search.fingerprint),
            error: None,
        }
    }

    /// A caller whose inputs failed validation: nothing ran, capital untouched.
    fn rejected(caller: &str, calls: usize, config: &SimulatorConfig, error: String) -> Self {
        Self {
            caller: caller.to_string(),
            calls,
            status: SearchStatus::Completed,
            best_params: None,
            best_final_capital: config.initial_capital,
            best_total_return: 0.0,
            best_trades_executed: 0,
            best_win_rate: 0.0,
            collapsed_capital: false,
            requires_extreme_params: false,
            fingerprint: None,
            error: Some(error),
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.error.is_some()
    }
}

/// Calls grouped by caller, each group in input order.
pub fn partition_by_caller(calls: &[Call]) -> BTreeMap<String, Vec<Call>> {
    let mut groups: BTreeMap<String, Vec<Call>> = BTreeMap::new();
    for call in calls {
        groups
            .entry(call.caller.clone())
            .or_default()
            .push(call.clone());
    }
    groups
}

/// Validate one caller's calls and candle paths, then fingerprint them.
fn prepare_caller(
    group: &[Call],
    candles: &CandlesByCallId,
    grid: &ParamGrid,
    config: &SimulatorConfig,
) -> Result<InputFingerprint, OptimizeError> {
    validate_inputs(group, candles, config)?;
    Ok(InputFingerprint::compute(group, candles, config, grid)?)
}

impl GridSearch {
    /// Optimize each caller's calls independently.
    ///
    /// A bad config aborts the whole run. Bad call data only rejects the
    /// caller it belongs to.
    pub fn optimize_per_caller(
        &self,
        calls: &[Call],
        candles: &CandlesByCallId,
        grid: &ParamGrid,
        config: &SimulatorConfig,
        thresholds: &ExtremeThresholds,
    ) -> Result<BTreeMap<String, PerCallerResult>, OptimizeError> {
        validate_config(config)?;
        let groups = partition_by_caller(calls);

        let evaluate = |(caller, group): (&String, &Vec<Call>)| {
            let result = match prepare_caller(group, candles, grid, config) {
                Ok(fingerprint) => {
                    let search = self.search(group, candles, grid, config, fingerprint);
                    PerCallerResult::from_search(caller, group.len(), search, config, thresholds)
                }
                Err(e) => {
                    warn!(caller = %caller, error = %e, "caller inputs rejected");
                    PerCallerResult::rejected(caller, group.len(), config, e.to_string())
                }
            };
            debug!(
                caller = %caller,
                calls = result.calls,
                best = ?result.best_params,
                final_capital = result.best_final_capital,
                win_rate = result.best_win_rate,
                collapsed = result.collapsed_capital,
                extreme = result.requires_extreme_params,
                "caller optimized"
            );
            (caller.clone(), result)
        };

        let results = self.install(|| -> BTreeMap<String, PerCallerResult> {
            if self.is_parallel() {
                groups.par_iter().map(evaluate).collect()
            } else {
                groups.iter().map(evaluate).collect()
            }
        })?;

        info!(
            callers = results.len(),
            rejected = results.values().filter(|r| r.is_rejected()).count(),
            collapsed = results.values().filter(|r| r.collapsed_capital).count(),
            extreme = results.values().filter(|r| r.requires_extreme_params).count(),
            "per-caller optimization finished"
        );
        Ok(results)
    }
}

/// [`GridSearch::optimize_per_caller`] with default settings and thresholds.
pub fn optimize_per_caller(
    calls: &[Call],
    candles: &CandlesByCallId,
    grid: &ParamGrid,
    config: &SimulatorConfig,
) -> Result<BTreeMap<String, PerCallerResult>, OptimizeError> {
    GridSearch::new().optimize_per_caller(
        calls,
        candles,
        grid,
        config,
        &ExtremeThresholds::default(),
    )
}
