//! Lightweight global metrics for QcStore.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Snapshot store (writes / reads / resets)
//! - Combiner (plots, admitted / rejected samples, heatmap rows)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Snapshot store -----
static SNAPSHOTS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static SNAPSHOT_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_READ: AtomicU64 = AtomicU64::new(0);
static MODULE_OUTPUTS_WRITTEN: AtomicU64 = AtomicU64::new(0);
static RESETS: AtomicU64 = AtomicU64::new(0);

// ----- Combiner -----
static PLOTS_MERGED: AtomicU64 = AtomicU64::new(0);
static SAMPLES_ADMITTED: AtomicU64 = AtomicU64::new(0);
static SAMPLES_REJECTED: AtomicU64 = AtomicU64::new(0);
static HEATMAP_ROWS_REMAPPED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    // Snapshot store
    pub snapshots_written: u64,
    pub snapshot_bytes_written: u64,
    pub snapshots_read: u64,
    pub module_outputs_written: u64,
    pub resets: u64,

    // Combiner
    pub plots_merged: u64,
    pub samples_admitted: u64,
    pub samples_rejected: u64,
    pub heatmap_rows_remapped: u64,
}

impl MetricsSnapshot {
    /// Доля допущенных сэмплов среди всех просмотренных меток.
    pub fn admit_ratio(&self) -> f64 {
        let total = self.samples_admitted + self.samples_rejected;
        if total == 0 {
            0.0
        } else {
            self.samples_admitted as f64 / total as f64
        }
    }
}

// ----- Recorders (Snapshot store) -----
pub fn record_snapshot_written(bytes: usize) {
    SNAPSHOTS_WRITTEN.fetch_add(1, Ordering::Relaxed);
    SNAPSHOT_BYTES_WRITTEN.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub fn record_snapshot_read() {
    SNAPSHOTS_READ.fetch_add(1, Ordering::Relaxed);
}

pub fn record_module_output_written() {
    MODULE_OUTPUTS_WRITTEN.fetch_add(1, Ordering::Relaxed);
}

pub fn record_reset() {
    RESETS.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (Combiner) -----
pub fn record_plot_merged() {
    PLOTS_MERGED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_samples(admitted: usize, rejected: usize) {
    SAMPLES_ADMITTED.fetch_add(admitted as u64, Ordering::Relaxed);
    SAMPLES_REJECTED.fetch_add(rejected as u64, Ordering::Relaxed);
}

pub fn record_heatmap_rows(rows: usize) {
    HEATMAP_ROWS_REMAPPED.fetch_add(rows as u64, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        snapshots_written: SNAPSHOTS_WRITTEN.load(Ordering::Relaxed),
        snapshot_bytes_written: SNAPSHOT_BYTES_WRITTEN.load(Ordering::Relaxed),
        snapshots_read: SNAPSHOTS_READ.load(Ordering::Relaxed),
        module_outputs_written: MODULE_OUTPUTS_WRITTEN.load(Ordering::Relaxed),
        resets: RESETS.load(Ordering::Relaxed),

        plots_merged: PLOTS_MERGED.load(Ordering::Relaxed),
        samples_admitted: SAMPLES_ADMITTED.load(Ordering::Relaxed),
        samples_rejected: SAMPLES_REJECTED.load(Ordering::Relaxed),
        heatmap_rows_remapped: HEATMAP_ROWS_REMAPPED.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    SNAPSHOTS_WRITTEN.store(0, Ordering::Relaxed);
    SNAPSHOT_BYTES_WRITTEN.store(0, Ordering::Relaxed);
    SNAPSHOTS_READ.store(0, Ordering::Relaxed);
    MODULE_OUTPUTS_WRITTEN.store(0, Ordering::Relaxed);
    RESETS.store(0, Ordering::Relaxed);

    PLOTS_MERGED.store(0, Ordering::Relaxed);
    SAMPLES_ADMITTED.store(0, Ordering::Relaxed);
    SAMPLES_REJECTED.store(0, Ordering::Relaxed);
    HEATMAP_ROWS_REMAPPED.store(0, Ordering::Relaxed);
}
