use super::cache::RecordCache;
use super::engine::MdnsEngine;
use super::wire::{DnsOutgoing, MDNS_SOCKET_ADDR};

use ferrous_mdns_application::ports::ServiceListener;
use ferrous_mdns_domain::clock::now_millis;
use ferrous_mdns_domain::dns_record::CLASS_IN;
use ferrous_mdns_domain::{
    service_type_name, DnsQuestion, DomainError, RecordData, RecordType, ServiceEvent,
    ServiceStateChange,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A running browse of one service type.
///
/// Dropping the handle stops the browse; `stop` also waits for the task.
pub struct ServiceBrowser {
    service_type: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ServiceBrowser {
    pub fn start(
        engine: &Arc<MdnsEngine>,
        service_type: &str,
        listener: Arc<dyn ServiceListener>,
    ) -> Result<Self, DomainError> {
        service_type_name(service_type)?;
        if engine.is_closed() {
            return Err(DomainError::TransportClosed);
        }

        let cancel = engine.shutdown_token().child_token();
        let task = BrowseTask {
            engine: Arc::clone(engine),
            service_type: service_type.to_string(),
            listener,
            known: FxHashMap::default(),
            last_query: 0,
        };
        let handle = tokio::spawn(task.run(cancel.clone()));

        debug!(service_type = %service_type, "Browser started");
        Ok(Self {
            service_type: service_type.to_string(),
            cancel,
            handle: Some(handle),
        })
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ServiceBrowser {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl MdnsEngine {
    /// Start browsing `service_type`, reporting transitions to `listener`.
    pub fn browse(
        self: &Arc<Self>,
        service_type: &str,
        listener: Arc<dyn ServiceListener>,
    ) -> Result<ServiceBrowser, DomainError> {
        ServiceBrowser::start(self, service_type, listener)
    }
}

/// What the browser last saw of an instance beyond its PTR.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InstanceDetails {
    srv: Option<RecordData>,
    txt: Option<RecordData>,
}

struct KnownInstance {
    name: String,
    details: Option<InstanceDetails>,
}

struct BrowseTask {
    engine: Arc<MdnsEngine>,
    service_type: String,
    listener: Arc<dyn ServiceListener>,
    known: FxHashMap<String, KnownInstance>,
    last_query: u64,
}

impl BrowseTask {
    async fn run(mut self, cancel: CancellationToken) {
        let mut cache_changes = self.engine.cache_signal().subscribe();
        let mut interface_changes = self.engine.interface_signal().subscribe();

        let config = self.engine.config();
        let initial_interval = Duration::from_millis(config.browser_initial_interval_ms);
        let max_interval = Duration::from_millis(config.browser_max_interval_ms);
        let [jitter_min, jitter_max] = config.query_jitter_ms;

        let mut interval = initial_interval;
        let mut next_query =
            Instant::now() + Duration::from_millis(fastrand::u64(jitter_min..=jitter_max));

        loop {
            let now = now_millis();
            self.reconcile(now);

            let (refresh_due, expiry) = self.lifetime_deadlines(now);
            let refresh_now = refresh_due.is_some_and(|due| due <= now);
            if refresh_now || Instant::now() >= next_query {
                self.send_query(now).await;
                if Instant::now() >= next_query {
                    next_query = Instant::now() + interval;
                    interval = (interval * 2).min(max_interval);
                }
                continue;
            }

            let mut wake_at = next_query;
            for deadline in [refresh_due, expiry].into_iter().flatten() {
                let delay = Duration::from_millis(deadline.saturating_sub(now));
                wake_at = wake_at.min(Instant::now() + delay);
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = cache_changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = interface_changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    interval = initial_interval;
                    next_query = Instant::now();
                }
                _ = sleep_until(wake_at) => {}
            }
        }

        debug!(service_type = %self.service_type, "Browser stopped");
    }

    /// Query for the type's PTR records, listing the live, fresh ones we
    /// hold as known answers.
    async fn send_query(&mut self, now: u64) {
        let mut out = DnsOutgoing::query();
        out.add_question(DnsQuestion::new(&self.service_type, RecordType::PTR, CLASS_IN));
        for record in self
            .engine
            .cache()
            .live_records(&self.service_type, RecordType::PTR, now)
        {
            if !record.is_stale(now) {
                out.add_answer_at_time(record, Some(now));
            }
        }

        self.last_query = now;
        if let Err(e) = self.engine.send(&out, MDNS_SOCKET_ADDR).await {
            warn!(service_type = %self.service_type, error = %e, "Failed to encode browse query");
        }
    }

    /// Earliest lifetime threshold of a tracked PTR not yet covered by a
    /// query, and the earliest expiry.
    fn lifetime_deadlines(&self, now: u64) -> (Option<u64>, Option<u64>) {
        let thresholds = &self.engine.config().refresh_thresholds;
        let mut refresh_due: Option<u64> = None;
        let mut expiry: Option<u64> = None;

        for record in self
            .engine
            .cache()
            .live_records(&self.service_type, RecordType::PTR, now)
        {
            let due = thresholds
                .iter()
                .map(|pct| record.expiration_time(*pct))
                .find(|at| *at > self.last_query);
            if let Some(due) = due {
                refresh_due = Some(refresh_due.map_or(due, |current| current.min(due)));
            }
            let expires = record.expiration_time(100);
            expiry = Some(expiry.map_or(expires, |current| current.min(expires)));
        }
        (refresh_due, expiry)
    }

    fn details(cache: &RecordCache, name: &str, now: u64) -> Option<InstanceDetails> {
        let srv = cache
            .latest_live(name, RecordType::SRV, now)
            .map(|record| record.data);
        let txt = cache
            .latest_live(name, RecordType::TXT, now)
            .map(|record| record.data);
        (srv.is_some() || txt.is_some()).then_some(InstanceDetails { srv, txt })
    }

    /// Diff the cache against the known instances and report each transition once.
    fn reconcile(&mut self, now: u64) {
        let mut present: FxHashMap<String, String> = FxHashMap::default();
        for record in self
            .engine
            .cache()
            .live_records(&self.service_type, RecordType::PTR, now)
        {
            if let Some(alias) = record.alias() {
                present
                    .entry(alias.to_ascii_lowercase())
                    .or_insert_with(|| alias.to_string());
            }
        }

        let mut removed: Vec<String> = self
            .known
            .keys()
            .filter(|key| !present.contains_key(*key))
            .cloned()
            .collect();
        removed.sort();
        for key in removed {
            if let Some(instance) = self.known.remove(&key) {
                self.notify(&instance.name, ServiceStateChange::Removed);
            }
        }

        let cache = Arc::clone(self.engine.cache());
        let mut updated = Vec::new();
        for (key, instance) in self.known.iter_mut() {
            let Some(details) = Self::details(&cache, &instance.name, now) else {
                continue;
            };
            if instance.details.as_ref().is_some_and(|seen| *seen != details) {
                updated.push(key.clone());
            }
            instance.details = Some(details);
        }
        updated.sort();

        let mut added: Vec<(String, String)> = present
            .into_iter()
            .filter(|(key, _)| !self.known.contains_key(key))
            .collect();
        added.sort();
        for (key, name) in added {
            let details = Self::details(&cache, &name, now);
            self.known.insert(
                key,
                KnownInstance {
                    name: name.clone(),
                    details,
                },
            );
            self.notify(&name, ServiceStateChange::Added);
        }

        for key in updated {
            if let Some(name) = self.known.get(&key).map(|instance| instance.name.clone()) {
                self.notify(&name, ServiceStateChange::Updated);
            }
        }
    }

    fn notify(&self, name: &str, state: ServiceStateChange) {
        debug!(service_type = %self.service_type, name = %name, state = %state, "Service state changed");
        let event = ServiceEvent::new(&self.service_type, name, state);
        self.listener.on_service_state_change(&event);
    }
}
