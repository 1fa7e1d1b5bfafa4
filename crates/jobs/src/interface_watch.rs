use ferrous_mdns_application::ports::InterfaceMonitorPort;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DEFAULT_WATCH_INTERVAL_SECS: u64 = 30;

/// Re-resolves the configured interface choice on a tick, so addresses that
/// appear or disappear are joined or left.
pub struct InterfaceWatchJob {
    monitor: Arc<dyn InterfaceMonitorPort>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl InterfaceWatchJob {
    pub fn new(monitor: Arc<dyn InterfaceMonitorPort>) -> Self {
        Self {
            monitor,
            interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
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
        info!(interval_secs = self.interval_secs, "Starting interface watch job");

        let job = Arc::clone(&self);
        tokio::spawn(async move {
            let period = Duration::from_secs(job.interval_secs.max(1));
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = job.shutdown.cancelled() => {
                        info!("InterfaceWatchJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        match job.monitor.refresh_interfaces().await {
                            Ok(outcome) => {
                                if outcome.added > 0 || outcome.removed > 0 {
                                    info!(
                                        added = outcome.added,
                                        removed = outcome.removed,
                                        active = outcome.active,
                                        "Network interfaces changed"
                                    );
                                }
                            }
                            Err(e) => {
                                error!(error = %e, "Interface refresh failed");
                            }
                        }
                    }
                }
            }
        });
    }
}
