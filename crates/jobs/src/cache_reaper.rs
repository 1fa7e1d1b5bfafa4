use ferrous_mdns_application::ports::CacheMaintenancePort;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const DEFAULT_REAP_INTERVAL_SECS: u64 = 10;

/// Drops expired records from the cache on a fixed tick.
pub struct CacheReaperJob {
    maintenance: Arc<dyn CacheMaintenancePort>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl CacheReaperJob {
    pub fn new(maintenance: Arc<dyn CacheMaintenancePort>) -> Self {
        Self {
            maintenance,
            interval_secs: DEFAULT_REAP_INTERVAL_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "Starting cache reaper job");

        let job = Arc::clone(&self);
        tokio::spawn(async move {
            let period = Duration::from_secs(job.interval_secs.max(1));
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = job.shutdown.cancelled() => {
                        info!("CacheReaperJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match job.maintenance.run_reap_cycle().await {
                            Ok(outcome) => {
                                if outcome.expired > 0 {
                                    debug!(
                                        expired = outcome.expired,
                                        cache_size = outcome.cache_size,
                                        "Cache reap cycle completed"
                                    );
                                }
                            }
                            Err(e) => {
                                error!(error = %e, "Cache reap cycle failed");
                            }
                        }
                    }
                }
            }
        });
    }
}
