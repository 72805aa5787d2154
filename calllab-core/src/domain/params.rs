//! Params: one point in the exit-rule search grid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Take-profit / stop-loss multiples of entry price plus a holding limit.
///
/// Valid params satisfy `0 < sl_mult < 1 < tp_mult` and a positive, finite
/// `max_hold_hrs`; see [`crate::validation::validate_params`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub tp_mult: f64,
    pub sl_mult: f64,
    pub max_hold_hrs: f64,
}

impl Params {
    pub fn new(tp_mult: f64, sl_mult: f64, max_hold_hrs: f64) -> Self {
        Self {
            tp_mult,
            sl_mult,
            max_hold_hrs,
        }
    }

    /// Fraction of the position lost when the stop fills.
    pub fn stop_fraction(&self) -> f64 {
        1.0 - self.sl_mult
    }

    /// Elementwise arithmetic mean. Returns None for an empty slice.
    pub fn mean<'a>(params: impl IntoIterator<Item = &'a Params>) -> Option<Params> {
        let mut n = 0usize;
        let (mut tp, mut sl, mut hold) = (0.0, 0.0, 0.0);
        for p in params {
            tp += p.tp_mult;
            sl += p.sl_mult;
            hold += p.max_hold_hrs;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let n = n as f64;
        Some(Params::new(tp / n, sl / n, hold / n))
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tp={}x sl={}x hold={}h",
            self.tp_mult, self.sl_mult, self.max_hold_hrs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_fraction() {
        let p = Params::new(2.0, 0.85, 24.0);
        assert!((p.stop_fraction() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn mean_of_params() {
        let a = Params::new(2.0, 0.9, 12.0);
        let b = Params::new(3.0, 0.8, 36.0);
        let m = Params::mean([&a, &b]).unwrap();
        assert!((m.tp_mult - 2.5).abs() < 1e-12);
        assert!((m.sl_mult - 0.85).abs() < 1e-12);
        assert!((m.max_hold_hrs - 24.0).abs() < 1e-12);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert!(Params::mean(std::iter::empty()).is_none());
    }
}
