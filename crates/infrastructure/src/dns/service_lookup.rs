use super::cache::RecordCache;
use super::engine::MdnsEngine;
use super::wire::{DnsOutgoing, MDNS_SOCKET_ADDR};

use ferrous_mdns_domain::clock::now_millis;
use ferrous_mdns_domain::dns_record::CLASS_IN;
use ferrous_mdns_domain::{
    service_type_name, DnsQuestion, DomainError, RecordData, RecordType, ServiceInfo,
};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

impl MdnsEngine {
    /// Resolve one instance to its full `ServiceInfo`.
    ///
    /// Answers straight from the cache when it already holds the SRV, TXT
    /// and address records; otherwise queries for what is missing until it
    /// is complete. Returns `Ok(None)` if `timeout` elapses first; a timeout
    /// too large to represent never elapses. Re-queries back off by doubling,
    /// up to the browser's maximum interval.
    pub async fn get_service_info(
        &self,
        service_type: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<ServiceInfo>, DomainError> {
        service_type_name(service_type)?;
        let base = service_type_name(name)?;
        if !service_type.to_ascii_lowercase().ends_with(&base.to_ascii_lowercase()) {
            return Err(DomainError::BadTypeInName(format!(
                "{:?} is not an instance of {:?}",
                name, service_type
            )));
        }

        let mut info = ServiceInfo::new(service_type, name);
        let mut changes = self.cache_signal().subscribe();
        let deadline = Instant::now().checked_add(timeout);
        let mut interval = Duration::from_millis(self.config().lookup_initial_interval_ms);
        let max_interval = Duration::from_millis(self.config().browser_max_interval_ms)
            .max(interval);
        let mut next_query = Instant::now();

        loop {
            let now = now_millis();
            if fill_from_cache(self.cache(), &mut info, now) {
                debug!(name = %name, "Service resolved");
                return Ok(Some(info));
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!(name = %name, "Service lookup timed out");
                return Ok(None);
            }

            if Instant::now() >= next_query {
                self.send(&lookup_query(self.cache(), &info, now), MDNS_SOCKET_ADDR)
                    .await?;
                next_query = Instant::now() + interval;
                interval = (interval * 2).min(max_interval);
            }
            let wake_at = deadline.map_or(next_query, |deadline| next_query.min(deadline));

            tokio::select! {
                _ = self.shutdown_token().cancelled() => return Ok(None),
                changed = changes.changed() => {
                    if changed.is_err() {
                        return Ok(None);
                    }
                }
                _ = sleep_until(wake_at) => {}
            }
        }
    }
}

/// Copy whatever the cache knows about `info.name` into `info`; true once
/// port, text and address are all known.
fn fill_from_cache(cache: &RecordCache, info: &mut ServiceInfo, now: u64) -> bool {
    let mut has_srv = false;
    let mut has_txt = false;

    if let Some(record) = cache.latest_live(&info.name, RecordType::SRV, now) {
        if let RecordData::Service {
            priority,
            weight,
            port,
            target,
        } = record.data
        {
            info.priority = priority;
            info.weight = weight;
            info.port = port;
            info.server = target;
            has_srv = true;
        }
    }

    if let Some(record) = cache.latest_live(&info.name, RecordType::TXT, now) {
        if let RecordData::Text(text) = record.data {
            info.set_text(text);
            has_txt = true;
        }
    }

    if has_srv {
        info.address = cache
            .latest_live(&info.server, RecordType::A, now)
            .or_else(|| cache.latest_live(&info.server, RecordType::AAAA, now))
            .and_then(|record| record.data.ip_addr());
    }

    has_srv && has_txt && info.address.is_some()
}

/// Questions for the records still missing, with the ones already held as
/// known answers.
fn lookup_query(cache: &RecordCache, info: &ServiceInfo, now: u64) -> DnsOutgoing {
    let mut out = DnsOutgoing::query();
    let mut ask = |name: &str, record_type: RecordType| {
        out.add_question(DnsQuestion::new(name, record_type, CLASS_IN));
        for record in cache.live_records(name, record_type, now) {
            out.add_answer_at_time(record, Some(now));
        }
    };

    ask(&info.name, RecordType::SRV);
    ask(&info.name, RecordType::TXT);
    if cache
        .latest_live(&info.name, RecordType::SRV, now)
        .is_some()
    {
        ask(&info.server, RecordType::A);
    }
    out
}
