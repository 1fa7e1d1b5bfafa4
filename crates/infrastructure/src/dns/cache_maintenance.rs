use super::cache::RecordCache;
use super::signal::ChangeSignal;

use async_trait::async_trait;
use ferrous_mdns_application::ports::{CacheMaintenancePort, CacheReapOutcome};
use ferrous_mdns_domain::clock::now_millis;
use ferrous_mdns_domain::DomainError;
use std::sync::Arc;
use tracing::debug;

/// Infrastructure adapter implementing `CacheMaintenancePort`.
pub struct RecordCacheMaintenance {
    cache: Arc<RecordCache>,
    signal: ChangeSignal,
}

impl RecordCacheMaintenance {
    pub fn new(cache: Arc<RecordCache>, signal: ChangeSignal) -> Self {
        Self { cache, signal }
    }
}

#[async_trait]
impl CacheMaintenancePort for RecordCacheMaintenance {
    async fn run_reap_cycle(&self) -> Result<CacheReapOutcome, DomainError> {
        let expired = self.cache.expire(now_millis());

        if !expired.is_empty() {
            for record in &expired {
                debug!(record = %record, "Record expired");
            }
            self.signal.notify_all();
        }

        Ok(CacheReapOutcome {
            expired: expired.len(),
            cache_size: self.cache.len(),
        })
    }
}
