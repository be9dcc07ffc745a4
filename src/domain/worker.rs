//! WorkerThread — state and health counters for one worker runtime (spec.md §3).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Initializing,
    Ready,
    Busy,
    Unhealthy,
    Terminated,
}

/// Typed worker health counters, replacing the source's `any`-typed `worker.toJSON()`
/// (spec.md §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerHealthSnapshot {
    pub trades_processed: u64,
    pub events_published: u64,
    pub avg_processing_ms: f64,
    pub memory_bytes: u64,
    pub cpu_percent: f64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub last_heartbeat: i64,
}

#[derive(Debug, Clone)]
pub struct WorkerThread {
    pub id: usize,
    pub state: WorkerState,
    pub assigned_symbols: HashSet<String>,
    pub health: WorkerHealthSnapshot,
}

impl WorkerThread {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            state: WorkerState::Initializing,
            assigned_symbols: HashSet::new(),
            health: WorkerHealthSnapshot::default(),
        }
    }

    pub fn mark_ready(&mut self) {
        self.state = WorkerState::Ready;
    }

    pub fn record_trade(&mut self, processing_ms: f64, now: i64) {
        let n = self.health.trades_processed;
        self.health.avg_processing_ms =
            (self.health.avg_processing_ms * n as f64 + processing_ms) / (n + 1) as f64;
        self.health.trades_processed += 1;
        self.health.last_heartbeat = now;
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.health.error_count += 1;
        self.health.last_error = Some(error.into());
    }
}

/// Aggregate health across the pool (spec.md §7: `unhealthyWorkers`,
/// `pendingWorkers`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolHealthSnapshot {
    pub worker_count: usize,
    pub unhealthy_workers: Vec<usize>,
    pub pending_workers: Vec<usize>,
    pub workers: Vec<(usize, WorkerHealthSnapshot)>,
}
