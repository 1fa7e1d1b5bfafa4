use super::key::CacheKey;
use super::{CacheMetrics, CachedRecord};
use ferrous_mdns_domain::{DnsEntry, DnsRecord, RecordType};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Lifetime left to a record after a goodbye or a cache-flush (RFC 6762 §10.1, §10.2).
pub const GOODBYE_GRACE_SECS: u32 = 1;

const GRACE_MS: u64 = GOODBYE_GRACE_SECS as u64 * 1000;

type Bucket = SmallVec<[CachedRecord; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheUpdate {
    Inserted,
    /// Replaced a copy that had expired or been withdrawn.
    Revived,
    /// Replaced a live copy.
    Refreshed { ttl_changed: bool },
}

impl CacheUpdate {
    /// Whether anyone watching the cache could observe the difference.
    pub fn is_visible(self) -> bool {
        !matches!(self, CacheUpdate::Refreshed { ttl_changed: false })
    }
}

/// Records learned from the network, bucketed by (name, type).
///
/// Every operation takes the single lock once; none of them await.
pub struct RecordCache {
    entries: RwLock<FxHashMap<CacheKey, Bucket>>,
    metrics: Arc<CacheMetrics>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Insert `record`, replacing any record with the same identity.
    ///
    /// The replacement moves to the end of its bucket so that entry lookups
    /// see it as the most recent.
    pub fn add(&self, record: DnsRecord) -> CacheUpdate {
        let key = CacheKey::for_entry(&record.entry);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let bucket = entries.entry(key).or_default();

        let update = match bucket
            .iter()
            .position(|cached| cached.record.same_identity(&record))
        {
            Some(index) => {
                let previous = bucket.remove(index);
                self.metrics.refreshes.fetch_add(1, AtomicOrdering::Relaxed);
                if previous.is_live(record.created) {
                    CacheUpdate::Refreshed {
                        ttl_changed: previous.record.ttl != record.ttl,
                    }
                } else {
                    CacheUpdate::Revived
                }
            }
            None => {
                self.metrics.insertions.fetch_add(1, AtomicOrdering::Relaxed);
                CacheUpdate::Inserted
            }
        };
        bucket.push(CachedRecord::new(record));
        update
    }

    /// Most recently added record for (name, type, class), expired or not.
    pub fn get(&self, entry: &DnsEntry) -> Option<DnsRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&CacheKey::for_entry(entry))?
            .iter()
            .rev()
            .find(|cached| cached.record.entry == *entry)
            .map(|cached| cached.record.clone())
    }

    /// The cached copy of `record` (same identity), expired or not.
    pub fn get_record(&self, record: &DnsRecord) -> Option<DnsRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&CacheKey::for_entry(&record.entry))?
            .iter()
            .find(|cached| cached.record.same_identity(record))
            .map(|cached| cached.record.clone())
    }

    /// Records for (name, type) that are neither expired nor withdrawn at `now`.
    pub fn live_records(&self, name: &str, record_type: RecordType, now: u64) -> Vec<DnsRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&CacheKey::new(name, record_type))
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|cached| cached.is_live(now))
                    .map(|cached| cached.record.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Newest live record for (name, type).
    pub fn latest_live(&self, name: &str, record_type: RecordType, now: u64) -> Option<DnsRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&CacheKey::new(name, record_type))?
            .iter()
            .rev()
            .find(|cached| cached.is_live(now))
            .map(|cached| cached.record.clone())
    }

    /// Every record under `name`, of any type.
    pub fn entries_with_name(&self, name: &str) -> Vec<DnsRecord> {
        let name = name.to_ascii_lowercase();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|(key, _)| key.name == name)
            .flat_map(|(_, bucket)| bucket.iter().map(|cached| cached.record.clone()))
            .collect()
    }

    pub fn entries(&self) -> Vec<DnsRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .values()
            .flat_map(|bucket| bucket.iter().map(|cached| cached.record.clone()))
            .collect()
    }

    /// Whether another responder currently advertises `alias` under `service_type`.
    pub fn has_live_alias(&self, service_type: &str, alias: &str, now: u64) -> bool {
        self.live_records(service_type, RecordType::PTR, now)
            .iter()
            .any(|record| record.alias().is_some_and(|a| a.eq_ignore_ascii_case(alias)))
    }

    pub fn remove(&self, record: &DnsRecord) -> bool {
        let key = CacheKey::for_entry(&record.entry);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(bucket) = entries.get_mut(&key) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|cached| !cached.record.same_identity(record));
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            entries.remove(&key);
        }
        removed
    }

    /// Apply a goodbye: the cached copy is marked withdrawn and left to
    /// expire after the grace period. Returns the copy as it was.
    pub fn withdraw(&self, record: &DnsRecord, now: u64) -> Option<DnsRecord> {
        let key = CacheKey::for_entry(&record.entry);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let cached = entries
            .get_mut(&key)?
            .iter_mut()
            .find(|cached| cached.record.same_identity(record))?;

        let previous = cached.record.clone();
        cached.record.created = now;
        cached.record.ttl = GOODBYE_GRACE_SECS;
        cached.withdrawn = true;
        self.metrics.goodbyes.fetch_add(1, AtomicOrdering::Relaxed);
        Some(previous)
    }

    /// Cache-flush handling for a unique `record`: other data under the same
    /// (name, type, class) older than the grace period expires shortly.
    pub fn flush_stale_peers(&self, record: &DnsRecord, now: u64) -> usize {
        let key = CacheKey::for_entry(&record.entry);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let Some(bucket) = entries.get_mut(&key) else {
            return 0;
        };

        let mut flushed = 0;
        for cached in bucket.iter_mut() {
            let peer = &mut cached.record;
            if peer.entry == record.entry
                && peer.data != record.data
                && now.saturating_sub(peer.created) > GRACE_MS
                && peer.expiration_time(100) > now + GRACE_MS
            {
                peer.created = now;
                peer.ttl = GOODBYE_GRACE_SECS;
                flushed += 1;
            }
        }
        self.metrics
            .flushes
            .fetch_add(flushed as u64, AtomicOrdering::Relaxed);
        flushed
    }

    /// Drop every record expired at `now` and return them.
    pub fn expire(&self, now: u64) -> Vec<DnsRecord> {
        let mut expired = Vec::new();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, bucket| {
            bucket.retain(|cached| {
                if cached.record.is_expired(now) {
                    expired.push(cached.record.clone());
                    false
                } else {
                    true
                }
            });
            !bucket.is_empty()
        });
        drop(entries);

        if !expired.is_empty() {
            self.metrics
                .expirations
                .fetch_add(expired.len() as u64, AtomicOrdering::Relaxed);
            debug!(expired = expired.len(), "Expired cached records");
        }
        expired
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new()
    }
}
