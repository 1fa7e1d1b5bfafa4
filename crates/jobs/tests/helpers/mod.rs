#![allow(dead_code)]

use async_trait::async_trait;
use ferrous_mdns_application::ports::{
    CacheMaintenancePort, CacheReapOutcome, InterfaceMonitorPort, InterfaceRefreshOutcome,
};
use ferrous_mdns_domain::DomainError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub struct MockCacheMaintenancePort {
    call_count: Arc<AtomicU64>,
    should_fail: AtomicBool,
}

impl MockCacheMaintenancePort {
    pub fn new() -> Self {
        Self {
            call_count: Arc::new(AtomicU64::new(0)),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl CacheMaintenancePort for MockCacheMaintenancePort {
    async fn run_reap_cycle(&self) -> Result<CacheReapOutcome, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::Transport("mock reap failure".to_string()));
        }
        Ok(CacheReapOutcome {
            expired: 1,
            cache_size: 10,
        })
    }
}

pub struct MockInterfaceMonitor {
    call_count: Arc<AtomicU64>,
    should_fail: AtomicBool,
}

impl MockInterfaceMonitor {
    pub fn new() -> Self {
        Self {
            call_count: Arc::new(AtomicU64::new(0)),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl InterfaceMonitorPort for MockInterfaceMonitor {
    async fn refresh_interfaces(&self) -> Result<InterfaceRefreshOutcome, DomainError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::Transport("mock refresh failure".to_string()));
        }
        Ok(InterfaceRefreshOutcome {
            added: 0,
            removed: 0,
            active: 1,
        })
    }
}
