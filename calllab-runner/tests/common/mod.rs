//! Shared fixtures for runner integration tests.
#![allow(dead_code)]

use calllab_core::{Call, Candle, CandlesByCallId, SimulatorConfig};
use calllab_runner::ParamGrid;

pub const MIN: i64 = 60_000;

/// Route `tracing` output through the test harness (`RUST_LOG=debug`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn frictionless() -> SimulatorConfig {
    SimulatorConfig::default().frictionless()
}

pub fn flat(ts_ms: i64) -> Candle {
    Candle::new(ts_ms, 1.0, 1.02, 0.98, 1.0, 1_000.0)
}

/// Spikes to 2.5x intrabar, then closes back at entry.
pub fn spike_path(start: i64) -> Vec<Candle> {
    vec![
        flat(start),
        Candle::new(start + MIN, 1.0, 2.5, 0.98, 1.0, 1_000.0),
        flat(start + 2 * MIN),
    ]
}

/// Runs to 6x and stays there.
pub fn moonshot_path(start: i64) -> Vec<Candle> {
    vec![
        flat(start),
        Candle::new(start + MIN, 1.0, 6.0, 0.98, 6.0, 1_000.0),
    ]
}

/// Halves on the second candle.
pub fn dump_path(start: i64) -> Vec<Candle> {
    vec![
        flat(start),
        Candle::new(start + MIN, 1.0, 1.0, 0.5, 0.5, 1_000.0),
    ]
}

/// Three callers, three calls each, interleaved in time:
/// - `winner`: spikes, best captured by a 2x target
/// - `loser`: every call stops out
/// - `moonshot`: runs to 6x, best captured by a 5x target
pub fn three_callers() -> (Vec<Call>, CandlesByCallId) {
    let mut calls = Vec::new();
    let mut candles = CandlesByCallId::new();
    for i in 0..3i64 {
        let base = i * 10 * MIN;
        for (caller, offset, path) in [
            ("winner", 0, spike_path(base)),
            ("moonshot", 2 * MIN, moonshot_path(base + 2 * MIN)),
            ("loser", 5 * MIN, dump_path(base + 5 * MIN)),
        ] {
            let id = format!("{caller}-{i}");
            calls.push(Call::new(id.clone(), "Mint", caller, base + offset));
            candles.insert(id, path);
        }
    }
    (calls, candles)
}

pub fn three_caller_grid() -> ParamGrid {
    ParamGrid::new(vec![2.0, 5.0], vec![0.9, 0.95], vec![24.0])
}

/// A larger deterministic universe with overlapping positions.
pub fn wavy_universe(n_calls: usize, candles_per_call: usize) -> (Vec<Call>, CandlesByCallId) {
    let mut calls = Vec::with_capacity(n_calls);
    let mut candles = CandlesByCallId::new();
    for i in 0..n_calls {
        let id = format!("call-{i}");
        let start = i as i64 * 3 * MIN;
        let path = (0..candles_per_call)
            .map(|k| {
                let x = (k as f64 + i as f64 * 1.7) * 0.21;
                let close = 1.0 + 0.6 * x.sin() * (1.0 + 0.1 * (i % 5) as f64);
                let close = close.max(0.05);
                let open = if k == 0 { 1.0 } else { close * 0.98 };
                Candle::new(
                    start + k as i64 * 5 * MIN,
                    open,
                    open.max(close) * 1.04,
                    open.min(close) * 0.96,
                    close,
                    500.0,
                )
            })
            .collect();
        calls.push(Call::new(id.clone(), "Mint", format!("caller-{}", i % 4), start));
        candles.insert(id, path);
    }
    (calls, candles)
}
