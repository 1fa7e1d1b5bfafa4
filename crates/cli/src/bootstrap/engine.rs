use ferrous_mdns_domain::Config;
use ferrous_mdns_infrastructure::dns::{MdnsEngine, UdpMulticastTransport};
use ferrous_mdns_jobs::{CacheReaperJob, InterfaceWatchJob, JobRunner};
use std::sync::Arc;
use tracing::info;

/// Bind the multicast socket, start the engine and its background jobs.
/// The jobs stop when the engine closes.
pub async fn start_engine(config: &Config) -> anyhow::Result<Arc<MdnsEngine>> {
    let transport = UdpMulticastTransport::bind(config.mdns.interfaces.clone()).await?;
    let engine = MdnsEngine::start(config.mdns.clone(), Arc::new(transport))?;

    let mut jobs = JobRunner::new()
        .with_cache_reaper(
            CacheReaperJob::new(Arc::new(engine.cache_maintenance()))
                .with_interval(config.mdns.reaper_interval_secs),
        )
        .with_shutdown_token(engine.shutdown_token().clone());
    if config.mdns.interface_watch_interval_secs > 0 {
        jobs = jobs.with_interface_watch(
            InterfaceWatchJob::new(engine.clone())
                .with_interval(config.mdns.interface_watch_interval_secs),
        );
    }
    jobs.start().await;

    info!(transport = engine.transport_name(), "mDNS engine started");
    Ok(engine)
}
