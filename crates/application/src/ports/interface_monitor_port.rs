use async_trait::async_trait;
use ferrous_mdns_domain::DomainError;

/// Outcome of re-resolving the configured interface choice.
#[derive(Debug, Default, Clone)]
pub struct InterfaceRefreshOutcome {
    pub added: usize,
    pub removed: usize,
    pub active: usize,
}

/// Port for noticing interfaces that appeared or went away.
#[async_trait]
pub trait InterfaceMonitorPort: Send + Sync {
    async fn refresh_interfaces(&self) -> Result<InterfaceRefreshOutcome, DomainError>;
}
