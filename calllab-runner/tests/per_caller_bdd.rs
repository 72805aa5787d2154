//! BDD tests for per-caller optimization.
//!
//! These tests verify:
//! - Each caller is optimized against its own fresh capital pool
//! - Collapsed-capital and extreme-param flags
//! - Configurable extreme thresholds
//! - A caller with broken candle data is rejected without sinking its siblings

mod common;

use calllab_core::{Call, Params, SimulatorConfig};
use calllab_runner::{
    optimize, optimize_per_caller, ExtremeThresholds, GridSearch, OptimizeError, SearchStatus,
};

use common::{frictionless, init_tracing, three_caller_grid, three_callers, MIN};

#[test]
fn bdd_scenario_callers_are_flagged_independently() {
    init_tracing();
    // GIVEN a winner, a loser and a moonshot caller
    let (calls, candles) = three_callers();

    // WHEN each caller is optimized separately
    let results =
        optimize_per_caller(&calls, &candles, &three_caller_grid(), &frictionless()).unwrap();

    // THEN results are keyed by caller in name order
    assert_eq!(
        results.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["loser", "moonshot", "winner"]
    );

    // AND the winner is healthy
    let winner = &results["winner"];
    assert_eq!(winner.best_params, Some(Params::new(2.0, 0.9, 24.0)));
    assert_eq!(winner.calls, 3);
    assert!(!winner.collapsed_capital);
    assert!(!winner.requires_extreme_params);
    assert!((winner.best_final_capital - 11_248.64).abs() < 1e-6);
    assert!((winner.best_total_return - 0.124864).abs() < 1e-9);
    assert_eq!(winner.best_win_rate, 1.0);
    assert!(winner.fingerprint.is_some());
    assert!(winner.error.is_none());

    // AND the loser's capital collapsed even with its least-bad params
    let loser = &results["loser"];
    assert_eq!(loser.best_params, Some(Params::new(2.0, 0.95, 24.0)));
    assert!(loser.collapsed_capital);
    assert!(!loser.requires_extreme_params);
    assert!(loser.best_total_return < 0.0);
    assert_eq!(loser.best_win_rate, 0.0);

    // AND the moonshot needs a target beyond 4x
    let moonshot = &results["moonshot"];
    assert_eq!(moonshot.best_params, Some(Params::new(5.0, 0.9, 24.0)));
    assert!(!moonshot.collapsed_capital);
    assert!(moonshot.requires_extreme_params);
}

#[test]
fn bdd_scenario_each_caller_gets_a_fresh_capital_pool() {
    // GIVEN the three-caller universe
    let (calls, candles) = three_callers();
    let grid = three_caller_grid();
    let config = frictionless();

    // WHEN the winner is optimized alone and as part of the per-caller run
    let per_caller = optimize_per_caller(&calls, &candles, &grid, &config).unwrap();
    let winner_calls: Vec<Call> = calls.into_iter().filter(|c| c.caller == "winner").collect();
    let alone = optimize(&winner_calls, &candles, &grid, &config).unwrap();

    // THEN the outcomes are identical
    assert_eq!(per_caller["winner"].best_params, alone.best_params);
    assert_eq!(per_caller["winner"].best_final_capital, alone.best_final_capital);
}

#[test]
fn bdd_scenario_thresholds_are_configurable() {
    // GIVEN thresholds that tolerate targets up to 6x
    let (calls, candles) = three_callers();
    let loose = ExtremeThresholds {
        sl_below: 0.88,
        tp_above: 6.0,
    };

    // WHEN the moonshot caller is evaluated
    let results = GridSearch::new()
        .optimize_per_caller(&calls, &candles, &three_caller_grid(), &frictionless(), &loose)
        .unwrap();

    // THEN its 5x target is no longer extreme
    assert!(!results["moonshot"].requires_extreme_params);
}

#[test]
fn bdd_scenario_default_costs_still_flag_the_loser() {
    // GIVEN default fees and slippage
    let (calls, candles) = three_callers();

    // WHEN optimized per caller
    let results = optimize_per_caller(
        &calls,
        &candles,
        &three_caller_grid(),
        &SimulatorConfig::default(),
    )
    .unwrap();

    // THEN costs deepen the loser's collapse but leave the winner healthy
    assert!(results["loser"].collapsed_capital);
    assert!(!results["winner"].collapsed_capital);
}

#[test]
fn bdd_scenario_broken_caller_does_not_sink_siblings() {
    init_tracing();
    // GIVEN the three healthy callers plus one whose calls have no usable path
    let (mut calls, mut candles) = three_callers();
    calls.push(Call::new("broken-0", "mint-broken", "broken", 5 * MIN));
    calls.push(Call::new("broken-1", "mint-broken", "broken", 6 * MIN));
    candles.insert("broken-0".into(), Vec::new());

    // WHEN each caller is optimized
    let results =
        optimize_per_caller(&calls, &candles, &three_caller_grid(), &frictionless()).unwrap();

    // THEN the broken caller is reported with its reason and nothing ran
    let broken = &results["broken"];
    assert!(broken.is_rejected());
    assert_eq!(broken.calls, 2);
    assert_eq!(broken.status, SearchStatus::Completed);
    assert!(broken.best_params.is_none());
    assert!(broken.fingerprint.is_none());
    assert_eq!(broken.best_final_capital, 10_000.0);
    assert!(!broken.collapsed_capital && !broken.requires_extreme_params);
    assert!(broken
        .error
        .as_deref()
        .is_some_and(|e| e.contains("broken-0")));

    // AND every healthy caller matches a run without the broken one
    let (clean_calls, clean_candles) = three_callers();
    let clean = optimize_per_caller(
        &clean_calls,
        &clean_candles,
        &three_caller_grid(),
        &frictionless(),
    )
    .unwrap();
    for caller in ["loser", "moonshot", "winner"] {
        assert_eq!(results[caller], clean[caller], "caller {caller}");
    }
}

#[test]
fn bdd_scenario_bad_config_still_aborts_everything() {
    // GIVEN a config with negative starting capital
    let (calls, candles) = three_callers();
    let config = SimulatorConfig {
        initial_capital: -1.0,
        ..frictionless()
    };

    // WHEN optimized per caller
    let err = optimize_per_caller(&calls, &candles, &three_caller_grid(), &config).unwrap_err();

    // THEN no caller runs at all
    assert!(matches!(err, OptimizeError::Validation(_)));
}
