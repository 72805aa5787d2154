//! Entry resolution: which candle opens the position and at what price.

use crate::config::EntryPricePolicy;
use crate::domain::Candle;

/// The resolved entry for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// Index of the entry candle in the path.
    pub index: usize,
    pub ts_ms: i64,
    pub price: f64,
    /// First candle index checked for TP/SL/time exits.
    pub scan_from: usize,
}

/// Locate the entry candle under `policy`. Returns None when no candle
/// qualifies or the entry price is not positive.
///
/// `path` must be sorted by timestamp (validated upstream).
pub fn find_entry(alert_ts_ms: i64, path: &[Candle], policy: EntryPricePolicy) -> Option<Entry> {
    let target_ts = match policy {
        EntryPricePolicy::FirstOpen | EntryPricePolicy::FirstClose => alert_ts_ms,
        EntryPricePolicy::DelayedOpen { delay_ms } => alert_ts_ms.saturating_add(delay_ms.max(0)),
    };

    let index = path.partition_point(|c| c.ts_ms < target_ts);
    let candle = path.get(index)?;

    let (price, scan_from) = match policy {
        EntryPricePolicy::FirstOpen | EntryPricePolicy::DelayedOpen { .. } => (candle.open, index),
        EntryPricePolicy::FirstClose => (candle.close, index + 1),
    };

    if !price.is_finite() || price <= 0.0 {
        return None;
    }

    Some(Entry {
        index,
        ts_ms: candle.ts_ms,
        price,
        scan_from,
    })
}
