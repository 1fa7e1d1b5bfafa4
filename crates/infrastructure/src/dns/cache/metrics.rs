use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

#[derive(Default)]
pub struct CacheMetrics {
    pub insertions: AtomicU64,
    pub refreshes: AtomicU64,
    pub goodbyes: AtomicU64,
    pub flushes: AtomicU64,
    pub expirations: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub insertions: u64,
    pub refreshes: u64,
    pub goodbyes: u64,
    pub flushes: u64,
    pub expirations: u64,
}

impl CacheMetrics {
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            insertions: self.insertions.load(AtomicOrdering::Relaxed),
            refreshes: self.refreshes.load(AtomicOrdering::Relaxed),
            goodbyes: self.goodbyes.load(AtomicOrdering::Relaxed),
            flushes: self.flushes.load(AtomicOrdering::Relaxed),
            expirations: self.expirations.load(AtomicOrdering::Relaxed),
        }
    }
}
