use async_trait::async_trait;
use ferrous_mdns_domain::DomainError;

/// Outcome of a cache reap cycle.
#[derive(Debug, Default, Clone)]
pub struct CacheReapOutcome {
    pub expired: usize,
    pub cache_size: usize,
}

/// Port for periodic record cache maintenance.
#[async_trait]
pub trait CacheMaintenancePort: Send + Sync {
    /// Remove every record whose TTL has run out and wake waiters if any were.
    async fn run_reap_cycle(&self) -> Result<CacheReapOutcome, DomainError>;
}
