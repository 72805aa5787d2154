//! BDD tests for caller filtering and grouped evaluation.

mod common;

use calllab_core::{simulate, Call, Params};
use calllab_runner::{
    run_grouped_evaluation, CallerFilter, CancelFlag, GridSearch, GroupedHold, ParamGrid,
};

use common::{frictionless, init_tracing, three_caller_grid, three_callers, MIN};

#[test]
fn bdd_scenario_default_filter_keeps_only_healthy_callers() {
    init_tracing();
    // GIVEN a winner, a loser and a moonshot caller
    let (calls, candles) = three_callers();

    // WHEN grouped evaluation runs with both filters on
    let grouped = run_grouped_evaluation(
        &calls,
        &candles,
        &three_caller_grid(),
        &frictionless(),
        &CallerFilter::default(),
    )
    .unwrap();

    // THEN only the winner is selected and its params are used unchanged
    assert_eq!(grouped.per_caller_results.len(), 3);
    assert_eq!(grouped.selected_callers, vec!["winner"]);
    assert_eq!(grouped.grouped_params, Some(Params::new(2.0, 0.9, 24.0)));

    // AND the grouped run matches the winner's solo optimum
    let result = grouped.grouped_result.as_ref().unwrap();
    assert_eq!(result.trades_executed, 3);
    assert_eq!(
        result.final_capital,
        grouped.per_caller_results["winner"].best_final_capital
    );
}

#[test]
fn bdd_scenario_unfiltered_group_shares_one_capital_pool() {
    // GIVEN both filters disabled
    let (calls, candles) = three_callers();
    let filter = CallerFilter::new(false, false);

    // WHEN grouped evaluation runs
    let grouped = run_grouped_evaluation(
        &calls,
        &candles,
        &three_caller_grid(),
        &frictionless(),
        &filter,
    )
    .unwrap();

    // THEN every caller is selected and params are averaged
    assert_eq!(grouped.selected_callers, vec!["loser", "moonshot", "winner"]);
    let params = grouped.grouped_params.unwrap();
    assert!((params.tp_mult - 3.0).abs() < 1e-12);
    assert!((params.sl_mult - (0.95 + 0.9 + 0.9) / 3.0).abs() < 1e-12);
    assert_eq!(params.max_hold_hrs, 24.0);

    // AND the grouped run is one chronological simulation over the union
    let direct = simulate(&calls, &candles, &params, &frictionless()).unwrap();
    assert_eq!(grouped.grouped_result, Some(direct));
}

#[test]
fn bdd_scenario_empty_selection_is_not_an_error() {
    // GIVEN only the collapsing caller
    let (calls, candles) = three_callers();
    let loser: Vec<Call> = calls.into_iter().filter(|c| c.caller == "loser").collect();

    // WHEN grouped evaluation runs with the collapse filter on
    let grouped = run_grouped_evaluation(
        &loser,
        &candles,
        &three_caller_grid(),
        &frictionless(),
        &CallerFilter::default(),
    )
    .unwrap();

    // THEN nothing is selected and there is no grouped run
    assert!(grouped.is_empty_selection());
    assert_eq!(grouped.grouped_params, None);
    assert_eq!(grouped.grouped_result, None);
    assert_eq!(grouped.per_caller_results.len(), 1);
}

#[test]
fn bdd_scenario_filter_is_idempotent() {
    // GIVEN per-caller results and each filter combination
    let (calls, candles) = three_callers();
    let per_caller = GridSearch::new()
        .optimize_per_caller(
            &calls,
            &candles,
            &three_caller_grid(),
            &frictionless(),
            &Default::default(),
        )
        .unwrap();

    for (collapsed, extreme) in [(true, true), (true, false), (false, true), (false, false)] {
        let filter = CallerFilter::new(collapsed, extreme);

        // WHEN the filter is applied twice, the second time to its own output
        let first = filter.apply(&per_caller);
        let narrowed = per_caller
            .iter()
            .filter(|(caller, _)| first.contains(*caller))
            .map(|(caller, result)| (caller.clone(), result.clone()))
            .collect();
        let second = filter.apply(&narrowed);

        // THEN the selection is unchanged
        assert_eq!(first, second);
        assert_eq!(first, filter.apply(&per_caller));
    }
}

#[test]
fn bdd_scenario_horizon_hold_overrides_mean() {
    // GIVEN a grid whose holds differ across callers' optima
    let (calls, candles) = three_callers();
    let grid = ParamGrid::new(vec![2.0, 5.0], vec![0.9, 0.95], vec![12.0, 24.0]);
    let config = frictionless();
    let filter = CallerFilter {
        hold: GroupedHold::Horizon,
        ..CallerFilter::new(false, false)
    };

    // WHEN grouped evaluation runs with the horizon hold
    let grouped = run_grouped_evaluation(&calls, &candles, &grid, &config, &filter).unwrap();

    // THEN the grouped hold is the simulator horizon
    assert_eq!(
        grouped.grouped_params.map(|p| p.max_hold_hrs),
        Some(config.max_trade_horizon_hrs)
    );
}

#[test]
fn bdd_scenario_cancelled_grouped_evaluation_selects_nobody() {
    // GIVEN a search cancelled before it starts
    let (calls, candles) = three_callers();
    let cancel = CancelFlag::new();
    cancel.cancel();

    // WHEN grouped evaluation runs
    let grouped = GridSearch::new()
        .with_cancel(cancel)
        .run_grouped_evaluation(
            &calls,
            &candles,
            &three_caller_grid(),
            &frictionless(),
            &CallerFilter::new(false, false),
        )
        .unwrap();

    // THEN no caller has best params, so none is selected
    assert!(grouped.per_caller_results.values().all(|r| r.best_params.is_none()));
    assert!(grouped.selected_callers.is_empty());
    assert!(grouped.grouped_result.is_none());
}

#[test]
fn bdd_scenario_rejected_caller_is_never_selected() {
    // GIVEN the three callers plus one whose call has no candle path at all
    let (mut calls, candles) = three_callers();
    calls.push(Call::new("orphan-0", "mint-orphan", "orphan", 2 * MIN));

    // WHEN grouped evaluation runs with both filters off
    let grouped = run_grouped_evaluation(
        &calls,
        &candles,
        &three_caller_grid(),
        &frictionless(),
        &CallerFilter::new(false, false),
    )
    .unwrap();

    // THEN the orphan is reported but left out of the pooled run
    assert!(grouped.per_caller_results["orphan"].is_rejected());
    assert_eq!(grouped.selected_callers, vec!["loser", "moonshot", "winner"]);
    let result = grouped.grouped_result.as_ref().unwrap();
    assert!(result.completed_trades.iter().all(|t| t.caller != "orphan"));
    assert_eq!(result.trades_executed + result.trades_skipped, 9);
}
