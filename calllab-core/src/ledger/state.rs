//! Capital state: free cash, open positions, realized PnL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An open position. Owned by the ledger from commit until its exit settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub call_id: String,
    pub caller: String,
    pub entry_ts_ms: i64,
    pub entry_px: f64,
    pub size: f64,
    pub tp_px: f64,
    pub sl_px: f64,
    pub deadline_ts_ms: i64,
}

/// Cash and open-position book for one run.
///
/// Conservation: `free_cash + committed() == initial_capital + realized_pnl`
/// after every commit and release.
#[derive(Debug, Clone)]
pub struct CapitalState {
    initial_capital: f64,
    free_cash: f64,
    realized_pnl: f64,
    open: BTreeMap<u64, Position>,
}

impl CapitalState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            free_cash: initial_capital,
            realized_pnl: 0.0,
            open: BTreeMap::new(),
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn free_cash(&self) -> f64 {
        self.free_cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.open.values()
    }

    /// Capital tied up in open positions.
    pub fn committed(&self) -> f64 {
        self.open.values().map(|p| p.size).sum()
    }

    /// Debit `position.size` and hold the position under `seq`.
    ///
    /// Returns false (and changes nothing) if the size exceeds free cash or
    /// `seq` is already open.
    pub fn commit(&mut self, seq: u64, position: Position) -> bool {
        if position.size > self.free_cash || self.open.contains_key(&seq) {
            return false;
        }
        self.free_cash -= position.size;
        self.open.insert(seq, position);
        true
    }

    /// Close the position under `seq`, crediting `size + pnl`.
    pub fn release(&mut self, seq: u64, pnl: f64) -> Option<Position> {
        let position = self.open.remove(&seq)?;
        self.free_cash += position.size + pnl;
        self.realized_pnl += pnl;
        Some(position)
    }

    /// Absolute drift from the conservation identity.
    pub fn conservation_error(&self) -> f64 {
        ((self.free_cash + self.committed()) - (self.initial_capital + self.realized_pnl)).abs()
    }
}
