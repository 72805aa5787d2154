//! Grid search over exit-rule parameters.
//!
//! Every `(tp, sl, hold)` combination gets an independent ledger run with a
//! fresh capital pool. Combinations share nothing mutable, so they run on
//! rayon workers; results are gathered in enumeration order, which keeps the
//! stable argmax (first combination with the greatest final capital)
//! identical between serial and parallel searches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use calllab_core::{
    simulate_unchecked, validate_inputs, validate_params, Call, CandlesByCallId,
    CapitalSimulationResult, InputFingerprint, Params, SimulationError, SimulatorConfig,
    ValidationError,
};

use crate::config::SearchSettings;

/// Candidate values for each parameter axis.
///
/// Combinations are enumerated `tp` outer, `sl` middle, `hold` inner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub tp_mults: Vec<f64>,
    pub sl_mults: Vec<f64>,
    pub max_hold_hrs: Vec<f64>,
}

impl ParamGrid {
    pub fn new(tp_mults: Vec<f64>, sl_mults: Vec<f64>, max_hold_hrs: Vec<f64>) -> Self {
        Self {
            tp_mults,
            sl_mults,
            max_hold_hrs,
        }
    }

    /// A one-point grid.
    pub fn single(params: Params) -> Self {
        Self::new(
            vec![params.tp_mult],
            vec![params.sl_mult],
            vec![params.max_hold_hrs],
        )
    }

    /// Total number of combinations.
    pub fn size(&self) -> usize {
        self.tp_mults.len() * self.sl_mults.len() * self.max_hold_hrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// All combinations in enumeration order.
    pub fn combinations(&self) -> Vec<Params> {
        let mut out = Vec::with_capacity(self.size());
        for &tp in &self.tp_mults {
            for &sl in &self.sl_mults {
                for &hold in &self.max_hold_hrs {
                    out.push(Params::new(tp, sl, hold));
                }
            }
        }
        out
    }

    /// First combination violating `0 < sl < 1 < tp` or a positive hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.combinations().iter().try_for_each(validate_params)
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self::new(
            vec![1.5, 2.0, 3.0, 4.0, 5.0],
            vec![0.7, 0.8, 0.85, 0.9],
            vec![6.0, 12.0, 24.0, 48.0],
        )
    }
}

/// Cooperative cancellation shared with a running search.
///
/// Checked before every combination; work already started finishes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Completed,
    Cancelled,
}

/// Headline numbers for one combination's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRunSummary {
    pub params: Params,
    pub final_capital: f64,
    pub total_return: f64,
    pub trades_executed: usize,
    pub trades_skipped: usize,
}

impl From<&CapitalSimulationResult> for ParamRunSummary {
    fn from(result: &CapitalSimulationResult) -> Self {
        Self {
            params: result.params,
            final_capital: result.final_capital,
            total_return: result.total_return,
            trades_executed: result.trades_executed,
            trades_skipped: result.trades_skipped,
        }
    }
}

/// A combination that was omitted, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub params: Params,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub status: SearchStatus,
    /// None when nothing ran, every combination failed, or the search was
    /// cancelled.
    pub best_params: Option<Params>,
    pub best_final_capital: f64,
    pub best_result: Option<CapitalSimulationResult>,
    /// Combinations attempted, failed ones included.
    pub params_evaluated: usize,
    /// Per-combination summaries in enumeration order. Always present when
    /// cancelled; otherwise only when requested.
    pub all_results: Option<Vec<ParamRunSummary>>,
    pub failures: Vec<RunFailure>,
    pub fingerprint: InputFingerprint,
}

impl OptimizationResult {
    pub fn is_cancelled(&self) -> bool {
        self.status == SearchStatus::Cancelled
    }

    /// Return of the best combination relative to `initial_capital`.
    pub fn best_total_return(&self, initial_capital: f64) -> f64 {
        if initial_capital > 0.0 {
            (self.best_final_capital - initial_capital) / initial_capital
        } else {
            0.0
        }
    }
}

/// Failures that abort a search outright.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("fingerprint serialization failed: {0}")]
    Fingerprint(#[from] serde_json::Error),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Grid search executor.
///
/// Defaults: parallel on the global rayon pool, summaries dropped, no
/// cancellation.
#[derive(Debug, Clone)]
pub struct GridSearch {
    parallel: bool,
    max_threads: Option<usize>,
    keep_all_results: bool,
    cancel: Option<CancelFlag>,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: None,
            keep_all_results: false,
            cancel: None,
        }
    }
}

impl GridSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self {
            parallel: settings.parallel,
            max_threads: settings.max_threads,
            keep_all_results: settings.keep_all_results,
            cancel: None,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run on a dedicated pool of at most `threads` workers.
    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = Some(threads.max(1));
        self
    }

    pub fn keep_all_results(mut self, keep: bool) -> Self {
        self.keep_all_results = keep;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Search `grid` for the combination with the greatest final capital.
    pub fn optimize(
        &self,
        calls: &[Call],
        candles: &CandlesByCallId,
        grid: &ParamGrid,
        config: &SimulatorConfig,
    ) -> Result<OptimizationResult, OptimizeError> {
        validate_inputs(calls, candles, config)?;
        let fingerprint = InputFingerprint::compute(calls, candles, config, grid)?;

        let result = self.install(|| self.search(calls, candles, grid, config, fingerprint))?;
        info!(
            status = ?result.status,
            evaluated = result.params_evaluated,
            failures = result.failures.len(),
            best_final_capital = result.best_final_capital,
            best_params = ?result.best_params,
            "grid search finished"
        );
        Ok(result)
    }

    /// Run `f` on the bounded pool when one is configured.
    pub(crate) fn install<R, F>(&self, f: F) -> Result<R, OptimizeError>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match self.max_threads {
            Some(threads) if self.parallel => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| OptimizeError::ThreadPool(e.to_string()))?;
                Ok(pool.install(f))
            }
            _ => Ok(f()),
        }
    }

    /// Grid search over inputs that were already validated.
    pub(crate) fn search(
        &self,
        calls: &[Call],
        candles: &CandlesByCallId,
        grid: &ParamGrid,
        config: &SimulatorConfig,
        fingerprint: InputFingerprint,
    ) -> OptimizationResult {
        if calls.is_empty() || grid.is_empty() {
            return OptimizationResult {
                status: SearchStatus::Completed,
                best_params: None,
                best_final_capital: config.initial_capital,
                best_result: None,
                params_evaluated: 0,
                all_results: self.keep_all_results.then(Vec::new),
                failures: Vec::new(),
                fingerprint,
            };
        }

        let combos = grid.combinations();
        let run_one = |params: &Params| -> Option<Result<ParamRunSummary, RunFailure>> {
            if self.cancelled() {
                return None;
            }
            if let Err(e) = validate_params(params) {
                return Some(Err(RunFailure {
                    params: *params,
                    error: e.to_string(),
                }));
            }
            let result = simulate_unchecked(calls, candles, params, config);
            Some(Ok(ParamRunSummary::from(&result)))
        };

        let outcomes: Vec<Option<Result<ParamRunSummary, RunFailure>>> = if self.parallel {
            combos.par_iter().map(run_one).collect()
        } else {
            combos.iter().map(run_one).collect()
        };
        self.conclude(outcomes, calls, candles, config, fingerprint)
    }

    /// Fold per-combination outcomes (in enumeration order) into a result.
    ///
    /// `None` marks a combination skipped by cancellation. The status depends
    /// only on those: a flag raised after the last combination finished does
    /// not discard a complete search.
    fn conclude(
        &self,
        outcomes: Vec<Option<Result<ParamRunSummary, RunFailure>>>,
        calls: &[Call],
        candles: &CandlesByCallId,
        config: &SimulatorConfig,
        fingerprint: InputFingerprint,
    ) -> OptimizationResult {
        let total = outcomes.len();
        let mut summaries = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = 0usize;
        for outcome in outcomes {
            match outcome {
                Some(Ok(summary)) => summaries.push(summary),
                Some(Err(failure)) => {
                    warn!(params = %failure.params, error = %failure.error, "combination omitted");
                    failures.push(failure);
                }
                None => skipped += 1,
            }
        }
        let params_evaluated = summaries.len() + failures.len();

        if skipped > 0 {
            warn!(completed = params_evaluated, total, "grid search cancelled");
            return OptimizationResult {
                status: SearchStatus::Cancelled,
                best_params: None,
                best_final_capital: config.initial_capital,
                best_result: None,
                params_evaluated,
                all_results: Some(summaries),
                failures,
                fingerprint,
            };
        }

        // Stable argmax: a later combination must be strictly better.
        let mut best: Option<&ParamRunSummary> = None;
        for summary in &summaries {
            if best.map_or(true, |b| summary.final_capital > b.final_capital) {
                best = Some(summary);
            }
        }
        let best_params = best.map(|b| b.params);
        debug!(best = ?best_params, candidates = summaries.len(), "argmax selected");

        // Runs are deterministic, so re-running the winner reproduces its
        // trades without holding every combination's trade log in memory.
        let best_result = best_params.map(|p| simulate_unchecked(calls, candles, &p, config));
        let best_final_capital = best_result
            .as_ref()
            .map_or(config.initial_capital, |r| r.final_capital);

        OptimizationResult {
            status: SearchStatus::Completed,
            best_params,
            best_final_capital,
            best_result,
            params_evaluated,
            all_results: self.keep_all_results.then_some(summaries),
            failures,
            fingerprint,
        }
    }
}

/// [`GridSearch::optimize`] with default settings.
pub fn optimize(
    calls: &[Call],
    candles: &CandlesByCallId,
    grid: &ParamGrid,
    config: &SimulatorConfig,
) -> Result<OptimizationResult, OptimizeError> {
    GridSearch::new().optimize(calls, candles, grid, config)
}
