//! Lightweight global metrics for a dump run.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - Raw log (replay)
//! - Merkle tree (загрузка узлов)
//! - Dumper (модули/записи)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Raw log -----
static RAW_RECORDS_REPLAYED: AtomicU64 = AtomicU64::new(0);
static RAW_TAIL_BYTES_SKIPPED: AtomicU64 = AtomicU64::new(0);

// ----- Tree -----
static TREE_NODES_LOADED: AtomicU64 = AtomicU64::new(0);

// ----- Dumper -----
static MODULES_DUMPED: AtomicU64 = AtomicU64::new(0);
static MODULES_SKIPPED: AtomicU64 = AtomicU64::new(0);
static ENTRIES_DUMPED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub raw_records_replayed: u64,
    pub raw_tail_bytes_skipped: u64,
    pub tree_nodes_loaded: u64,
    pub modules_dumped: u64,
    pub modules_skipped: u64,
    pub entries_dumped: u64,
}

impl MetricsSnapshot {
    /// Среднее число записей на выведенный модуль.
    pub fn avg_entries_per_module(&self) -> f64 {
        if self.modules_dumped == 0 {
            0.0
        } else {
            self.entries_dumped as f64 / self.modules_dumped as f64
        }
    }
}

#[inline]
pub fn record_raw_records_replayed(n: u64) {
    RAW_RECORDS_REPLAYED.fetch_add(n, Ordering::Relaxed);
}

#[inline]
pub fn record_raw_tail_skipped(bytes: u64) {
    RAW_TAIL_BYTES_SKIPPED.fetch_add(bytes, Ordering::Relaxed);
}

#[inline]
pub fn record_tree_node_loaded() {
    TREE_NODES_LOADED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_module_dumped(entries: u64) {
    MODULES_DUMPED.fetch_add(1, Ordering::Relaxed);
    ENTRIES_DUMPED.fetch_add(entries, Ordering::Relaxed);
}

#[inline]
pub fn record_module_skipped() {
    MODULES_SKIPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        raw_records_replayed: RAW_RECORDS_REPLAYED.load(Ordering::Relaxed),
        raw_tail_bytes_skipped: RAW_TAIL_BYTES_SKIPPED.load(Ordering::Relaxed),
        tree_nodes_loaded: TREE_NODES_LOADED.load(Ordering::Relaxed),
        modules_dumped: MODULES_DUMPED.load(Ordering::Relaxed),
        modules_skipped: MODULES_SKIPPED.load(Ordering::Relaxed),
        entries_dumped: ENTRIES_DUMPED.load(Ordering::Relaxed),
    }
}
