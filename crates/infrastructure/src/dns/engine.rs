use super::cache::{CacheUpdate, RecordCache};
use super::cache_maintenance::RecordCacheMaintenance;
use super::log_backoff::LogBackoff;
use super::registry::ServiceRegistry;
use super::signal::ChangeSignal;
use super::wire::{DnsIncoming, DnsOutgoing, HEADER_LEN, MDNS_PORT, MDNS_SOCKET_ADDR};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ferrous_mdns_application::ports::{
    InterfaceChange, InterfaceMonitorPort, InterfaceRefreshOutcome, MdnsTransport,
};
use ferrous_mdns_domain::clock::now_millis;
use ferrous_mdns_domain::dns_record::CLASS_IN;
use ferrous_mdns_domain::service_name::validate_domain_name;
use ferrous_mdns_domain::{
    service_type_name, DnsQuestion, DnsRecord, DomainError, InterfaceChoice, MdnsConfig,
    RecordType, ServiceInfo,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Default)]
pub struct EngineStats {
    pub packets_received: AtomicU64,
    pub invalid_packets: AtomicU64,
    pub queries_answered: AtomicU64,
    pub packets_sent: AtomicU64,
    pub send_failures: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub packets_received: u64,
    pub invalid_packets: u64,
    pub queries_answered: u64,
    pub packets_sent: u64,
    pub send_failures: u64,
}

impl EngineStats {
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            packets_received: self.packets_received.load(AtomicOrdering::Relaxed),
            invalid_packets: self.invalid_packets.load(AtomicOrdering::Relaxed),
            queries_answered: self.queries_answered.load(AtomicOrdering::Relaxed),
            packets_sent: self.packets_sent.load(AtomicOrdering::Relaxed),
            send_failures: self.send_failures.load(AtomicOrdering::Relaxed),
        }
    }
}

struct PendingAnnouncement {
    info: ServiceInfo,
    restart: bool,
}

/// One mDNS responder/querier bound to a transport.
///
/// Owns the record cache and the registry of local services. All tasks that
/// belong to the engine (receiver, browsers, lookups) stop when its shutdown
/// token is cancelled by `close`.
pub struct MdnsEngine {
    config: MdnsConfig,
    transport: Arc<dyn MdnsTransport>,
    cache: Arc<RecordCache>,
    registry: ServiceRegistry,
    cache_signal: ChangeSignal,
    interface_signal: ChangeSignal,
    shutdown: CancellationToken,
    announcements: DashMap<String, PendingAnnouncement>,
    interface_choice: Mutex<InterfaceChoice>,
    log_backoff: LogBackoff,
    stats: EngineStats,
    closing: AtomicBool,
}

impl MdnsEngine {
    /// Build an engine without starting its receiver.
    ///
    /// Fails with `ConfigError` when `config` does not validate.
    pub fn new(
        config: MdnsConfig,
        transport: Arc<dyn MdnsTransport>,
    ) -> Result<Arc<Self>, DomainError> {
        config.validate().map_err(DomainError::ConfigError)?;
        info!(
            transport = transport.transport_name(),
            interfaces = %config.interfaces,
            max_packet_size = config.max_packet_size,
            "Initializing mDNS engine"
        );

        Ok(Arc::new(Self {
            log_backoff: LogBackoff::new(
                config.log_recurrence_window(),
                config.log_escalation_interval(),
            ),
            interface_choice: Mutex::new(config.interfaces.clone()),
            config,
            transport,
            cache: Arc::new(RecordCache::new()),
            registry: ServiceRegistry::new(),
            cache_signal: ChangeSignal::new(),
            interface_signal: ChangeSignal::new(),
            shutdown: CancellationToken::new(),
            announcements: DashMap::new(),
            stats: EngineStats::default(),
            closing: AtomicBool::new(false),
        }))
    }

    /// Build an engine and spawn the task feeding it received packets.
    pub fn start(
        config: MdnsConfig,
        transport: Arc<dyn MdnsTransport>,
    ) -> Result<Arc<Self>, DomainError> {
        let engine = Self::new(config, transport)?;
        engine.spawn_receiver();
        Ok(engine)
    }

    fn spawn_receiver(self: &Arc<Self>) {
        let engine = Arc::downgrade(self);
        let transport = Arc::clone(&self.transport);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let packet = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    packet = transport.recv() => packet,
                };
                let Some(packet) = packet else { break };
                let Some(engine) = engine.upgrade() else { break };
                engine.handle_packet(&packet.data, packet.source).await;
            }
            debug!("mDNS receiver stopped");
        });
    }

    pub fn config(&self) -> &MdnsConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<RecordCache> {
        &self.cache
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn cache_signal(&self) -> &ChangeSignal {
        &self.cache_signal
    }

    pub fn interface_signal(&self) -> &ChangeSignal {
        &self.interface_signal
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.transport_name()
    }

    /// Adapter for the cache reaper job.
    pub fn cache_maintenance(&self) -> RecordCacheMaintenance {
        RecordCacheMaintenance::new(Arc::clone(&self.cache), self.cache_signal.clone())
    }

    /// Decode one datagram and dispatch it. Malformed packets are dropped.
    pub async fn handle_packet(&self, data: &[u8], source: SocketAddr) {
        self.stats
            .packets_received
            .fetch_add(1, AtomicOrdering::Relaxed);

        let message = DnsIncoming::parse(data);
        if !message.is_valid() {
            self.stats
                .invalid_packets
                .fetch_add(1, AtomicOrdering::Relaxed);
            let reason = message.error().unwrap_or("unknown");
            self.log_backoff.report(
                &format!("malformed:{}", source.ip()),
                "Dropping malformed mDNS packet",
                &reason,
            );
            return;
        }

        if message.is_query() {
            self.handle_query(&message, source).await;
        } else {
            self.handle_response(&message);
        }
    }

    /// Answer a query from the registry, omitting what the asker already knows.
    pub async fn handle_query(&self, query: &DnsIncoming, source: SocketAddr) {
        let out = self.build_response(query);
        let legacy = source.port() != MDNS_PORT;

        if legacy {
            let unicast = self.build_legacy_response(query);
            if !unicast.answers.is_empty() {
                debug!(source = %source, answers = unicast.answers.len(), "Answering legacy unicast query");
                if let Err(e) = self.send(&unicast, source).await {
                    warn!(source = %source, error = %e, "Failed to encode unicast response");
                }
            }
        }

        if out.answers.is_empty() {
            return;
        }
        self.stats
            .queries_answered
            .fetch_add(1, AtomicOrdering::Relaxed);
        if let Err(e) = self.send(&out, MDNS_SOCKET_ADDR).await {
            warn!(error = %e, "Failed to encode multicast response");
        }
    }

    /// Multicast response to `query`, with known-answer suppression applied.
    pub fn build_response(&self, query: &DnsIncoming) -> DnsOutgoing {
        let mut out = DnsOutgoing::response();
        let mut additionals = Vec::new();

        for question in &query.questions {
            let answer = self.registry.answer_query(question);
            for record in answer.answers {
                if !contains_identity(&out.answers, &record) {
                    out.add_answer(query, record);
                }
            }
            additionals.extend(answer.additionals);
        }

        for record in additionals {
            if !contains_identity(&out.answers, &record)
                && !contains_identity(&out.additionals, &record)
            {
                out.add_additional_answer(record);
            }
        }
        out
    }

    /// Unicast reply for a resolver that is not a full mDNS participant
    /// (RFC 6762 §6.7): id and questions echoed, no cache-flush bits.
    fn build_legacy_response(&self, query: &DnsIncoming) -> DnsOutgoing {
        let mut out = DnsOutgoing::response()
            .with_id(query.id)
            .with_multicast(false);
        for question in &query.questions {
            out.add_question(question.clone());
            for record in self.registry.answer_query(question).answers {
                if !contains_identity(&out.answers, &record) {
                    out.add_answer_at_time(record, None);
                }
            }
        }
        out
    }

    /// Fold a response into the cache and wake whoever waits on it.
    pub fn handle_response(&self, response: &DnsIncoming) {
        let now = now_millis();
        let mut changed = false;

        for record in response.answers.iter().chain(response.additionals.iter()) {
            if record.is_goodbye() {
                if self.cache.withdraw(record, now).is_some() {
                    debug!(record = %record, "Goodbye received");
                    changed = true;
                }
                continue;
            }

            if record.entry.unique && self.cache.flush_stale_peers(record, now) > 0 {
                changed = true;
            }

            let update = self.cache.add(record.clone());
            if update == CacheUpdate::Inserted {
                debug!(record = %record, "Cached new record");
            }
            changed |= update.is_visible();
        }

        if changed {
            self.cache_signal.notify_all();
        }
    }

    /// Encode `out` into as many packets as the budget requires and send
    /// them. Encoding errors are returned; transport failures are only logged.
    pub async fn send(&self, out: &DnsOutgoing, destination: SocketAddr) -> Result<(), DomainError> {
        if out.is_empty() {
            return Ok(());
        }

        for packet in out.packets(self.config.max_packet_size)? {
            for name in &packet.oversized {
                self.log_backoff.report(
                    &format!("oversized:{}", name),
                    "Entry does not fit an empty packet, skipped",
                    name,
                );
            }
            if packet.bytes.len() <= HEADER_LEN {
                continue;
            }

            match self.transport.send(&packet.bytes, destination).await {
                Ok(()) => {
                    self.stats.packets_sent.fetch_add(1, AtomicOrdering::Relaxed);
                }
                Err(e) => {
                    self.stats
                        .send_failures
                        .fetch_add(1, AtomicOrdering::Relaxed);
                    self.log_backoff.report(
                        if destination == MDNS_SOCKET_ADDR {
                            "send:multicast"
                        } else {
                            "send:unicast"
                        },
                        "Failed to send mDNS packet",
                        &e,
                    );
                }
            }
        }
        Ok(())
    }

    /// Sleep unless the engine shuts down first; false on shutdown.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Publish `info`. On success the chosen name (which differs from the
    /// requested one after a rename) is written back into `info`.
    ///
    /// `ttl` defaults to the configured TTL.
    pub async fn register_service(
        &self,
        info: &mut ServiceInfo,
        ttl: Option<u32>,
        allow_rename: bool,
    ) -> Result<(), DomainError> {
        if self.is_closed() {
            return Err(DomainError::TransportClosed);
        }
        info.validate()?;
        info.ttl = ttl.unwrap_or(self.config.default_ttl);

        loop {
            self.resolve_conflicts(info, allow_rename)?;
            self.probe(info).await?;
            if !self.has_conflict(info) {
                break;
            }
            if !allow_rename {
                return Err(DomainError::NonUniqueName(info.name.clone()));
            }
            debug!(name = %info.name, "Name claimed while probing");
        }

        self.registry.add(info.clone())?;
        info!(name = %info.name, ttl = info.ttl, "Service registered");
        self.announce(info.clone()).await
    }

    /// Withdraw a registered service with goodbye packets.
    pub async fn unregister_service(&self, info: &ServiceInfo) -> Result<(), DomainError> {
        let registered = self
            .registry
            .remove(&info.name)
            .ok_or_else(|| DomainError::ServiceNotRegistered(info.name.clone()))?;
        self.announcements.remove(&registered.key());

        info!(name = %registered.name, "Service unregistered");
        self.send_goodbyes(std::slice::from_ref(&registered)).await
    }

    /// Re-announce a registered service with new data under its registered TTL.
    pub async fn update_service(&self, info: &ServiceInfo) -> Result<(), DomainError> {
        info.validate()?;
        let mut updated = info.clone();
        updated.ttl = self
            .registry
            .get_info_name(&info.name)
            .ok_or_else(|| DomainError::ServiceNotRegistered(info.name.clone()))?
            .ttl;

        self.registry.update(updated.clone())?;
        debug!(name = %updated.name, "Service updated");
        self.announce(updated).await
    }

    pub async fn unregister_all_services(&self) -> Result<(), DomainError> {
        let infos: Vec<ServiceInfo> = self
            .registry
            .infos()
            .into_iter()
            .filter_map(|info| self.registry.remove(&info.name))
            .collect();
        self.announcements.clear();

        if !infos.is_empty() {
            info!(services = infos.len(), "Unregistering all services");
        }
        self.send_goodbyes(&infos).await
    }

    /// Goodbyes for every local service, then shut down every task and
    /// release the transport. Failures along the way are only logged.
    pub async fn close(&self) {
        if self.closing.swap(true, AtomicOrdering::SeqCst) {
            return;
        }

        if let Err(e) = self.unregister_all_services().await {
            debug!(error = %e, "Goodbyes not sent during close");
        }

        self.shutdown.cancel();
        self.cache_signal.notify_all();
        self.interface_signal.notify_all();
        self.transport.close().await;

        let stats = self.stats.snapshot();
        info!(
            packets_received = stats.packets_received,
            packets_sent = stats.packets_sent,
            send_failures = stats.send_failures,
            "mDNS engine closed"
        );
    }

    /// Switch interfaces at runtime: goodbyes before leaving interfaces,
    /// then a fresh announcement of every service and an immediate re-query
    /// by every browser.
    pub async fn update_interfaces(
        &self,
        choice: InterfaceChoice,
    ) -> Result<InterfaceChange, DomainError> {
        if self.is_closed() {
            return Err(DomainError::TransportClosed);
        }

        let services = self.registry.infos();
        let leaving = match &choice {
            InterfaceChoice::List(wanted) => self
                .transport
                .active_interfaces()
                .iter()
                .any(|ip| !wanted.contains(ip)),
            InterfaceChoice::All | InterfaceChoice::Default => false,
        };
        if leaving {
            self.send_goodbyes(&services).await?;
        }

        let change = self.transport.set_interfaces(choice.clone()).await?;
        *self
            .interface_choice
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = choice;

        if change.is_empty() {
            return Ok(change);
        }

        info!(
            added = change.added.len(),
            removed = change.removed.len(),
            "Interfaces changed"
        );
        self.interface_signal.notify_all();

        if !services.is_empty() {
            let mut out = DnsOutgoing::response();
            for info in &services {
                for record in info.dns_records(info.ttl) {
                    out.add_answer_at_time(record, None);
                }
            }
            for round in 0..self.config.announce_count {
                self.send(&out, MDNS_SOCKET_ADDR).await?;
                if round + 1 < self.config.announce_count
                    && !self.pause(self.config.announce_interval()).await
                {
                    break;
                }
            }
        }
        Ok(change)
    }

    fn has_conflict(&self, info: &ServiceInfo) -> bool {
        let now = now_millis();
        let service_type = service_type_name(&info.service_type)
            .unwrap_or_else(|_| info.service_type.clone());
        let ours = info.srv_record(info.ttl);

        self.registry.contains(&info.name)
            || self.cache.has_live_alias(&service_type, &info.name, now)
            || self
                .cache
                .live_records(&info.name, RecordType::SRV, now)
                .iter()
                .any(|srv| srv.data != ours.data)
    }

    /// Fail on a taken name, or rename to `<instance>-N` with the lowest free N.
    fn resolve_conflicts(&self, info: &mut ServiceInfo, allow_rename: bool) -> Result<(), DomainError> {
        if !self.has_conflict(info) {
            return Ok(());
        }
        if !allow_rename {
            return Err(DomainError::NonUniqueName(info.name.clone()));
        }

        let requested = info.name.clone();
        let instance = info.instance_name().to_string();
        let base = service_type_name(&info.name)?;
        let mut suffix = 2u32;
        loop {
            info.name = format!("{}-{}.{}", instance, suffix, base);
            if !self.has_conflict(info) {
                break;
            }
            suffix += 1;
        }
        validate_domain_name(&info.name)?;

        info!(requested = %requested, chosen = %info.name, "Renamed service to avoid a conflict");
        Ok(())
    }

    /// Probe queries claiming the name (RFC 6762 §8.1).
    async fn probe(&self, info: &ServiceInfo) -> Result<(), DomainError> {
        let mut out = DnsOutgoing::query();
        out.add_question(DnsQuestion::new(&info.name, RecordType::ANY, CLASS_IN));
        for record in info.ownership_records(info.ttl) {
            out.add_authoritative_answer(record);
        }

        for _ in 0..self.config.probe_count {
            self.send(&out, MDNS_SOCKET_ADDR).await?;
            if !self.pause(self.config.probe_interval()).await {
                return Err(DomainError::TransportClosed);
            }
        }
        Ok(())
    }

    /// Run the announcement sequence for `info`, or fold it into the one
    /// already running for the same name, which then starts over with the
    /// newest records.
    async fn announce(&self, info: ServiceInfo) -> Result<(), DomainError> {
        let key = info.key();
        match self.announcements.entry(key.clone()) {
            Entry::Occupied(mut pending) => {
                let pending = pending.get_mut();
                pending.info = info;
                pending.restart = true;
                debug!(name = %key, "Announcement coalesced into running sequence");
                return Ok(());
            }
            Entry::Vacant(slot) => {
                slot.insert(PendingAnnouncement {
                    info,
                    restart: false,
                });
            }
        }

        let count = self.config.announce_count;
        let mut round = 0;
        loop {
            let next = self.announcements.get_mut(&key).map(|mut pending| {
                if pending.restart {
                    pending.restart = false;
                    round = 0;
                }
                (round < count).then(|| pending.info.clone())
            });

            let info = match next {
                None => return Ok(()),
                Some(Some(info)) => info,
                Some(None) => {
                    if self
                        .announcements
                        .remove_if(&key, |_, pending| !pending.restart)
                        .is_some()
                    {
                        return Ok(());
                    }
                    continue;
                }
            };

            if let Err(e) = self.send(&announcement(&info), MDNS_SOCKET_ADDR).await {
                self.announcements.remove(&key);
                return Err(e);
            }
            round += 1;

            if round < count && !self.pause(self.config.announce_interval()).await {
                self.announcements.remove(&key);
                return Ok(());
            }
        }
    }

    async fn send_goodbyes(&self, infos: &[ServiceInfo]) -> Result<(), DomainError> {
        if infos.is_empty() {
            return Ok(());
        }

        let mut out = DnsOutgoing::response();
        for info in infos {
            for record in info.dns_records(0) {
                out.add_answer_at_time(record, None);
            }
        }

        let count = self.config.goodbye_count;
        for round in 0..count {
            self.send(&out, MDNS_SOCKET_ADDR).await?;
            if round + 1 < count && !self.pause(self.config.goodbye_interval()).await {
                break;
            }
        }
        Ok(())
    }
}

/// Answers for the full record set plus the ownership records as authorities.
fn announcement(info: &ServiceInfo) -> DnsOutgoing {
    let mut out = DnsOutgoing::response();
    for record in info.dns_records(info.ttl) {
        out.add_answer_at_time(record, None);
    }
    for record in info.ownership_records(info.ttl) {
        out.add_authoritative_answer(record);
    }
    out
}

fn contains_identity(records: &[DnsRecord], record: &DnsRecord) -> bool {
    records.iter().any(|r| r.same_identity(record))
}

#[async_trait]
impl InterfaceMonitorPort for MdnsEngine {
    async fn refresh_interfaces(&self) -> Result<InterfaceRefreshOutcome, DomainError> {
        let choice = self
            .interface_choice
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let change = self.update_interfaces(choice).await?;

        Ok(InterfaceRefreshOutcome {
            added: change.added.len(),
            removed: change.removed.len(),
            active: self.transport.active_interfaces().len(),
        })
    }
}

impl std::fmt::Debug for MdnsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdnsEngine")
            .field("transport", &self.transport.transport_name())
            .field("services", &self.registry.len())
            .field("cached_records", &self.cache.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
