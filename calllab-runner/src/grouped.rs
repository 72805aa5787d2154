//! Caller filtering and grouped re-evaluation.
//!
//! Healthy callers (best params found, capital not collapsed, params not
//! extreme) are pooled: their calls are merged into one chronological stream
//! and run once through a shared capital ledger with the callers' averaged
//! params. The grouped params are fixed, not re-optimized.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use calllab_core::{
    simulate, Call, CandlesByCallId, CapitalSimulationResult, Params, SimulatorConfig,
};

use crate::per_caller::{ExtremeThresholds, PerCallerResult};
use crate::sweep::{GridSearch, OptimizeError, ParamGrid};

/// How the grouped holding limit is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupedHold {
    /// Mean of the selected callers' `max_hold_hrs`.
    #[default]
    Mean,
    /// The simulator's `max_trade_horizon_hrs`.
    Horizon,
}

/// Which per-caller outcomes disqualify a caller from the group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallerFilter {
    pub filter_collapsed: bool,
    pub filter_extreme: bool,
    pub thresholds: ExtremeThresholds,
    pub hold: GroupedHold,
}

impl Default for CallerFilter {
    fn default() -> Self {
        Self {
            filter_collapsed: true,
            filter_extreme: true,
            thresholds: ExtremeThresholds::default(),
            hold: GroupedHold::Mean,
        }
    }
}

impl CallerFilter {
    pub fn new(filter_collapsed: bool, filter_extreme: bool) -> Self {
        Self {
            filter_collapsed,
            filter_extreme,
            ..Self::default()
        }
    }

    pub fn accepts(&self, result: &PerCallerResult) -> bool {
        result.best_params.is_some()
            && !(self.filter_collapsed && result.collapsed_capital)
            && !(self.filter_extreme && result.requires_extreme_params)
    }

    /// Selected callers in ascending name order. Pure, so applying it again
    /// to its own selection returns the same set.
    pub fn apply(&self, per_caller: &BTreeMap<String, PerCallerResult>) -> Vec<String> {
        per_caller
            .iter()
            .filter(|(_, result)| self.accepts(result))
            .map(|(caller, _)| caller.clone())
            .collect()
    }

    /// Elementwise mean of the selected callers' best params.
    pub fn grouped_params(
        &self,
        per_caller: &BTreeMap<String, PerCallerResult>,
        selected: &[String],
        config: &SimulatorConfig,
    ) -> Option<Params> {
        let best: Vec<Params> = selected
            .iter()
            .filter_map(|caller| per_caller.get(caller)?.best_params)
            .collect();
        let mean = Params::mean(&best)?;
        Some(match self.hold {
            GroupedHold::Mean => mean,
            GroupedHold::Horizon => Params {
                max_hold_hrs: config.max_trade_horizon_hrs,
                ..mean
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedResult {
    pub per_caller_results: BTreeMap<String, PerCallerResult>,
    pub selected_callers: Vec<String>,
    pub grouped_params: Option<Params>,
    pub grouped_result: Option<CapitalSimulationResult>,
}

impl GroupedResult {
    pub fn is_empty_selection(&self) -> bool {
        self.selected_callers.is_empty()
    }
}

impl GridSearch {
    /// Optimize per caller, filter, then run the selected callers together.
    pub fn run_grouped_evaluation(
        &self,
        calls: &[Call],
        candles: &CandlesByCallId,
        grid: &ParamGrid,
        config: &SimulatorConfig,
        filter: &CallerFilter,
    ) -> Result<GroupedResult, OptimizeError> {
        let per_caller =
            self.optimize_per_caller(calls, candles, grid, config, &filter.thresholds)?;
        let selected_callers = filter.apply(&per_caller);

        let grouped_params = filter.grouped_params(&per_caller, &selected_callers, config);
        let grouped_result = match grouped_params {
            Some(params) if !self.cancelled() => {
                let selected: BTreeSet<&str> =
                    selected_callers.iter().map(String::as_str).collect();
                let pooled: Vec<Call> = calls
                    .iter()
                    .filter(|c| selected.contains(c.caller.as_str()))
                    .cloned()
                    .collect();
                Some(simulate(&pooled, candles, &params, config)?)
            }
            _ => None,
        };

        info!(
            callers = per_caller.len(),
            selected = selected_callers.len(),
            grouped_params = ?grouped_params,
            grouped_final_capital = grouped_result.as_ref().map(|r| r.final_capital),
            "grouped evaluation finished"
        );

        Ok(GroupedResult {
            per_caller_results: per_caller,
            selected_callers,
            grouped_params: grouped_result.as_ref().and(grouped_params),
            grouped_result,
        })
    }
}

/// [`GridSearch::run_grouped_evaluation`] with default search settings.
pub fn run_grouped_evaluation(
    calls: &[Call],
    candles: &CandlesByCallId,
    grid: &ParamGrid,
    config: &SimulatorConfig,
    filter: &CallerFilter,
) -> Result<GroupedResult, OptimizeError> {
    GridSearch::new().run_grouped_evaluation(calls, candles, grid, config, filter)
}
