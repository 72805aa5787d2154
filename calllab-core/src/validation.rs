//! Fail-fast input validation, run before any simulation starts.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::SimulatorConfig;
use crate::domain::{Call, Candle, CandlesByCallId, Params};

/// Malformed params, config, or candle data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid params ({params}): {reason}")]
    InvalidParams { params: Params, reason: &'static str },
    #[error("invalid config field `{field}` = {value}: {reason}")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("duplicate call id '{0}'")]
    DuplicateCallId(String),
    #[error("no candle path for call '{0}'")]
    MissingCandles(String),
    #[error("empty candle path for call '{0}'")]
    EmptyCandles(String),
    #[error("call '{call_id}': candle {index} at {ts_ms} precedes previous candle at {prev_ts_ms}")]
    NonMonotonicCandles {
        call_id: String,
        index: usize,
        ts_ms: i64,
        prev_ts_ms: i64,
    },
    #[error("call '{call_id}': candle {index} at {ts_ms} has non-finite, non-positive, or inverted prices")]
    InsaneCandle {
        call_id: String,
        index: usize,
        ts_ms: i64,
    },
}

/// Enforce `0 < sl_mult < 1 < tp_mult` and a positive finite holding limit.
pub fn validate_params(params: &Params) -> Result<(), ValidationError> {
    let fail = |reason| ValidationError::InvalidParams {
        params: *params,
        reason,
    };
    if !params.sl_mult.is_finite() || params.sl_mult <= 0.0 || params.sl_mult >= 1.0 {
        return Err(fail("sl_mult must lie strictly between 0 and 1"));
    }
    if !params.tp_mult.is_finite() || params.tp_mult <= 1.0 {
        return Err(fail("tp_mult must be greater than 1"));
    }
    if !params.max_hold_hrs.is_finite() || params.max_hold_hrs <= 0.0 {
        return Err(fail("max_hold_hrs must be positive"));
    }
    Ok(())
}

pub fn validate_config(config: &SimulatorConfig) -> Result<(), ValidationError> {
    fn check(
        field: &'static str,
        value: f64,
        ok: bool,
        reason: &'static str,
    ) -> Result<(), ValidationError> {
        if ok && value.is_finite() {
            Ok(())
        } else {
            Err(ValidationError::InvalidConfig {
                field,
                value,
                reason,
            })
        }
    }

    check(
        "initial_capital",
        config.initial_capital,
        config.initial_capital >= 0.0,
        "must be non-negative",
    )?;
    check(
        "max_allocation_pct",
        config.max_allocation_pct,
        (0.0..=1.0).contains(&config.max_allocation_pct),
        "must lie in [0, 1]",
    )?;
    check(
        "max_risk_per_trade",
        config.max_risk_per_trade,
        config.max_risk_per_trade >= 0.0,
        "must be non-negative",
    )?;
    check(
        "max_trade_horizon_hrs",
        config.max_trade_horizon_hrs,
        config.max_trade_horizon_hrs > 0.0,
        "must be positive",
    )?;
    check(
        "min_executable_size",
        config.min_executable_size,
        config.min_executable_size >= 0.0,
        "must be non-negative",
    )?;
    check(
        "taker_fee_bps",
        config.taker_fee_bps,
        config.taker_fee_bps >= 0.0,
        "must be non-negative",
    )?;
    check(
        "slippage_bps",
        config.slippage_bps,
        config.slippage_bps >= 0.0,
        "must be non-negative",
    )?;
    check(
        "cost_haircut",
        config.cost_haircut(),
        config.cost_haircut() < 1.0,
        "fees plus slippage must stay below 10000 bps",
    )
}

/// A candle path must be non-empty, time-ordered, and made of sane candles.
pub fn validate_path(call_id: &str, path: &[Candle]) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyCandles(call_id.to_string()));
    }
    for (index, candle) in path.iter().enumerate() {
        if !candle.is_sane() {
            return Err(ValidationError::InsaneCandle {
                call_id: call_id.to_string(),
                index,
                ts_ms: candle.ts_ms,
            });
        }
        if index > 0 && candle.ts_ms < path[index - 1].ts_ms {
            return Err(ValidationError::NonMonotonicCandles {
                call_id: call_id.to_string(),
                index,
                ts_ms: candle.ts_ms,
                prev_ts_ms: path[index - 1].ts_ms,
            });
        }
    }
    Ok(())
}

/// Validate config, call ids, and every referenced candle path.
pub fn validate_inputs(
    calls: &[Call],
    candles: &CandlesByCallId,
    config: &SimulatorConfig,
) -> Result<(), ValidationError> {
    validate_config(config)?;
    let mut seen = HashSet::with_capacity(calls.len());
    for call in calls {
        if !seen.insert(call.id.as_str()) {
            return Err(ValidationError::DuplicateCallId(call.id.clone()));
        }
        let path = candles
            .get(&call.id)
            .ok_or_else(|| ValidationError::MissingCandles(call.id.clone()))?;
        validate_path(&call.id, path)?;
    }
    Ok(())
}
