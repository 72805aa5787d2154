//! Call: one trading signal eligible for exactly one simulated position.

use serde::{Deserialize, Serialize};

/// A trading signal posted by a caller for a given mint at `ts_ms`.
///
/// Calls are immutable inputs. The ledger opens at most one position per call
/// and never re-enters after that position closes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    pub mint: String,
    pub caller: String,
    /// Alert time in Unix milliseconds.
    pub ts_ms: i64,
}

impl Call {
    pub fn new(
        id: impl Into<String>,
        mint: impl Into<String>,
        caller: impl Into<String>,
        ts_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            mint: mint.into(),
            caller: caller.into(),
            ts_ms,
        }
    }
}

/// Stable chronological order: ascending `ts_ms`, input order breaks ties.
pub fn sort_chronologically(calls: &[Call]) -> Vec<&Call> {
    let mut ordered: Vec<&Call> = calls.iter().collect();
    ordered.sort_by_key(|c| c.ts_ms);
    ordered
}
