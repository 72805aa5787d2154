//! Path policy: resolve candles where both TP and SL are touched.
//!
//! A candle's high/low range can span both thresholds. OHLC alone cannot say
//! which was hit first, so the intrabar policy decides.

use crate::config::IntrabarPolicy;
use crate::domain::{Candle, ExitReason};

/// Which threshold, if any, a candle closes the trade on.
pub fn resolve_touch(
    policy: IntrabarPolicy,
    candle: &Candle,
    touched_tp: bool,
    touched_sl: bool,
) -> Option<ExitReason> {
    match (touched_tp, touched_sl) {
        (false, false) => None,
        (true, false) => Some(ExitReason::TakeProfit),
        (false, true) => Some(ExitReason::StopLoss),
        (true, true) => Some(ambiguous(policy, candle)),
    }
}

fn ambiguous(policy: IntrabarPolicy, candle: &Candle) -> ExitReason {
    match policy {
        IntrabarPolicy::StopFirst => ExitReason::StopLoss,
        IntrabarPolicy::TakeProfitFirst => ExitReason::TakeProfit,
        IntrabarPolicy::OhlcPath => {
            // |open - high| <= |open - low| → Open → High → Low → Close
            let high_first = (candle.open - candle.high).abs() <= (candle.open - candle.low).abs();
            if high_first {
                ExitReason::TakeProfit
            } else {
                ExitReason::StopLoss
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(0, open, high, low, close, 0.0)
    }

    #[test]
    fn stop_first_on_ambiguous_candle() {
        let c = candle(1.0, 2.5, 0.5, 1.0);
        assert_eq!(
            resolve_touch(IntrabarPolicy::StopFirst, &c, true, true),
            Some(ExitReason::StopLoss)
        );
    }

    #[test]
    fn take_profit_first_on_ambiguous_candle() {
        let c = candle(1.0, 2.5, 0.5, 1.0);
        assert_eq!(
            resolve_touch(IntrabarPolicy::TakeProfitFirst, &c, true, true),
            Some(ExitReason::TakeProfit)
        );
    }

    #[test]
    fn ohlc_path_high_first() {
        // |1.0 - 1.2| = 0.2 <= |1.0 - 0.5| = 0.5
        let c = candle(1.0, 1.2, 0.5, 0.9);
        assert_eq!(
            resolve_touch(IntrabarPolicy::OhlcPath, &c, true, true),
            Some(ExitReason::TakeProfit)
        );
    }

    #[test]
    fn ohlc_path_low_first() {
        let c = candle(1.0, 2.0, 0.9, 1.5);
        assert_eq!(
            resolve_touch(IntrabarPolicy::OhlcPath, &c, true, true),
            Some(ExitReason::StopLoss)
        );
    }

    #[test]
    fn single_touch_ignores_policy() {
        let c = candle(1.0, 2.0, 0.9, 1.5);
        for policy in [
            IntrabarPolicy::StopFirst,
            IntrabarPolicy::TakeProfitFirst,
            IntrabarPolicy::OhlcPath,
        ] {
            assert_eq!(
                resolve_touch(policy, &c, true, false),
                Some(ExitReason::TakeProfit)
            );
            assert_eq!(
                resolve_touch(policy, &c, false, true),
                Some(ExitReason::StopLoss)
            );
            assert_eq!(resolve_touch(policy, &c, false, false), None);
        }
    }
}
