//! Exit event queue: resolved exits ordered by time, then admission order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A scheduled exit: the position admitted as `seq` leaves at `exit_ts_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExitEvent {
    pub exit_ts_ms: i64,
    pub seq: u64,
}

/// Min-heap of pending exits.
#[derive(Debug, Default)]
pub struct EventScheduler {
    pending: BinaryHeap<Reverse<ExitEvent>>,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, exit_ts_ms: i64, seq: u64) {
        self.pending.push(Reverse(ExitEvent { exit_ts_ms, seq }));
    }

    /// Pop the earliest exit due at or before `ts_ms`.
    pub fn pop_due(&mut self, ts_ms: i64) -> Option<ExitEvent> {
        match self.pending.peek() {
            Some(Reverse(event)) if event.exit_ts_ms <= ts_ms => {
                self.pending.pop().map(|Reverse(e)| e)
            }
            _ => None,
        }
    }

    /// Pop the earliest exit regardless of time.
    pub fn pop_next(&mut self) -> Option<ExitEvent> {
        self.pending.pop().map(|Reverse(e)| e)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
