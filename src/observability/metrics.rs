use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals shared by the acquisition and persistence workers
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    blocks_acquired: AtomicU64,
    samples_acquired: AtomicU64,
    blocks_persisted: AtomicU64,
    rows_written: AtomicU64,
    sink_bytes: AtomicU64,
    read_faults: AtomicU64,
    observer_drops: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub blocks_acquired: u64,
    /// Per channel
    pub samples_acquired: u64,
    pub blocks_persisted: u64,
    pub rows_written: u64,
    pub sink_bytes: u64,
    pub read_faults: u64,
    pub observer_drops: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_block_acquired(&self, samples_per_channel: usize) {
        self.blocks_acquired.fetch_add(1, Ordering::Relaxed);
        self.samples_acquired
            .fetch_add(samples_per_channel as u64, Ordering::Relaxed);
    }

    pub fn record_block_persisted(&self, rows: usize, sink_bytes: u64) {
        self.blocks_persisted.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
        self.sink_bytes.store(sink_bytes, Ordering::Relaxed);
    }

    pub fn record_read_fault(&self) {
        self.read_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_observer_drop(&self) {
        self.observer_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn blocks_acquired(&self) -> u64 {
        self.blocks_acquired.load(Ordering::Relaxed)
    }

    pub fn blocks_persisted(&self) -> u64 {
        self.blocks_persisted.load(Ordering::Relaxed)
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    pub fn sink_bytes(&self) -> u64 {
        self.sink_bytes.load(Ordering::Relaxed)
    }

    pub fn read_faults(&self) -> u64 {
        self.read_faults.load(Ordering::Relaxed)
    }

    /// Blocks acquired but not yet written
    pub fn backlog(&self) -> u64 {
        self.blocks_acquired().saturating_sub(self.blocks_persisted())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            blocks_acquired: self.blocks_acquired(),
            samples_acquired: self.samples_acquired.load(Ordering::Relaxed),
            blocks_persisted: self.blocks_persisted(),
            rows_written: self.rows_written(),
            sink_bytes: self.sink_bytes(),
            read_faults: self.read_faults(),
            observer_drops: self.observer_drops.load(Ordering::Relaxed),
        }
    }
}
