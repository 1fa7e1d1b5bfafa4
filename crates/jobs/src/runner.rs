use crate::{CacheReaperJob, InterfaceWatchJob};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub trait SpawnableJob: Send + 'static {
    fn with_cancellation(self, token: CancellationToken) -> Self;
    fn start_job(self: Arc<Self>) -> tokio::task::JoinHandle<()>;
}

macro_rules! impl_spawnable_job {
    ($t:ty) => {
        impl SpawnableJob for $t {
            fn with_cancellation(self, token: CancellationToken) -> Self {
                self.with_cancellation(token)
            }

            fn start_job(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
                tokio::spawn(async move { self.start().await })
            }
        }
    };
}

impl_spawnable_job!(CacheReaperJob);
impl_spawnable_job!(InterfaceWatchJob);

fn spawn_job<J: SpawnableJob>(job: Option<J>, shutdown: &Option<CancellationToken>) {
    if let Some(job) = job {
        let job = match shutdown {
            Some(token) => job.with_cancellation(token.clone()),
            None => job,
        };
        Arc::new(job).start_job();
    }
}

/// Starts the engine's background jobs, all tied to one shutdown token.
pub struct JobRunner {
    cache_reaper: Option<CacheReaperJob>,
    interface_watch: Option<InterfaceWatchJob>,
    shutdown: Option<CancellationToken>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            cache_reaper: None,
            interface_watch: None,
            shutdown: None,
        }
    }

    pub fn with_cache_reaper(mut self, job: CacheReaperJob) -> Self {
        self.cache_reaper = Some(job);
        self
    }

    pub fn with_interface_watch(mut self, job: InterfaceWatchJob) -> Self {
        self.interface_watch = Some(job);
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub async fn start(self) {
        info!("Starting background job runner");

        spawn_job(self.cache_reaper, &self.shutdown);
        spawn_job(self.interface_watch, &self.shutdown);

        info!("All background jobs started");
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
