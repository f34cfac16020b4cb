//! Metrics collection for permission engines.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one engine's operations.
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Number of capability queries answered.
    pub queries: Arc<AtomicU64>,
    /// Number of queries answered with a grant.
    pub grants: Arc<AtomicU64>,
    /// Number of mutation operations that changed at least one cell.
    pub mutations: Arc<AtomicU64>,
    /// Number of cells changed by mutations.
    pub cells_changed: Arc<AtomicU64>,
    /// Number of successful store writes.
    pub store_writes: Arc<AtomicU64>,
    /// Error counts by kind.
    pub error_counts: Arc<DashMap<String, AtomicU64>>,
}

impl EngineMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a capability query.
    pub fn record_query(&self, granted: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if granted {
            self.grants.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a mutation that changed `cells` cells.
    pub fn record_mutation(&self, cells: usize) {
        if cells == 0 {
            return;
        }
        self.mutations.fetch_add(1, Ordering::Relaxed);
        self.cells_changed.fetch_add(cells as u64, Ordering::Relaxed);
    }

    /// Record a successful store write.
    pub fn record_store_write(&self) {
        self.store_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an error by kind.
    pub fn record_error(&self, kind: &str) {
        self.error_counts
            .entry(kind.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            queries: self.queries.load(Ordering::Relaxed),
            grants: self.grants.load(Ordering::Relaxed),
            mutations: self.mutations.load(Ordering::Relaxed),
            cells_changed: self.cells_changed.load(Ordering::Relaxed),
            store_writes: self.store_writes.load(Ordering::Relaxed),
            error_counts: self
                .error_counts
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

/// A snapshot of [`EngineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSummary {
    pub queries: u64,
    pub grants: u64,
    pub mutations: u64,
    pub cells_changed: u64,
    pub store_writes: u64,
    pub error_counts: HashMap<String, u64>,
}

impl MetricsSummary {
    /// Number of errors recorded for a kind.
    pub fn errors(&self, kind: &str) -> u64 {
        self.error_counts.get(kind).copied().unwrap_or(0)
    }
}
