//! Named gauges and counters behind a registry object.
//!
//! The registry is owned by whoever composes the application and passed by
//! reference (`Arc`) to the components that record into it. Components must
//! not keep process-wide static counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// Registry of named integer metrics.
///
/// Gauges and counters share one representation: an `AtomicI64` cell keyed by
/// a stable dotted name (e.g. `stock.commit.events`). `set` gives gauge
/// semantics, `add` gives counter semantics.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    cells: RwLock<HashMap<String, Arc<AtomicI64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, name: &str) -> Arc<AtomicI64> {
        let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
        if let Some(cell) = cells.get(name) {
            return cell.clone();
        }
        drop(cells);

        let mut cells = self.cells.write().unwrap_or_else(|e| e.into_inner());
        cells
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicI64::new(0)))
            .clone()
    }

    /// Set a gauge to an absolute value.
    pub fn set(&self, name: &str, value: i64) {
        self.cell(name).store(value, Ordering::Relaxed);
    }

    /// Add a delta to a counter (or gauge).
    pub fn add(&self, name: &str, delta: i64) {
        self.cell(name).fetch_add(delta, Ordering::Relaxed);
    }

    /// Current value of a metric (0 if never recorded).
    pub fn get(&self, name: &str) -> i64 {
        let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
        cells
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Snapshot all metrics, for exporters and tests.
    pub fn snapshot(&self) -> HashMap<String, i64> {
        let cells = self.cells.read().unwrap_or_else(|e| e.into_inner());
        cells
            .iter()
            .map(|(name, cell)| (name.clone(), cell.load(Ordering::Relaxed)))
            .collect()
    }
}
