//! Candle: one OHLCV bar on a call's price path.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OHLCV candle keyed by its open timestamp (Unix ms).
///
/// Paths may be irregular or sparse; nothing assumes a fixed cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(ts_ms: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            ts_ms,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any price field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: finite, positive, and high >= low.
    ///
    /// Open/close outside [low, high] is tolerated: aggregated feeds for thin
    /// tokens routinely report wicks that disagree with the body.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low && self.low > 0.0 && self.open > 0.0 && self.close > 0.0
    }
}

/// Candle paths keyed by call id, as materialized by the candle feed.
pub type CandlesByCallId = HashMap<String, Vec<Candle>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Candle {
        Candle::new(1_000, 1.0, 1.2, 0.9, 1.1, 5_000.0)
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample().is_sane());
    }

    #[test]
    fn candle_detects_void() {
        let mut c = sample();
        c.close = f64::NAN;
        assert!(c.is_void());
        assert!(!c.is_sane());
    }

    #[test]
    fn candle_detects_inverted_range() {
        let mut c = sample();
        c.high = 0.8;
        assert!(!c.is_sane());
    }

    #[test]
    fn volume_defaults_when_missing() {
        let c: Candle =
            serde_json::from_str(r#"{"ts_ms":5,"open":1.0,"high":1.0,"low":1.0,"close":1.0}"#)
                .unwrap();
        assert_eq!(c.volume, 0.0);
    }
}
