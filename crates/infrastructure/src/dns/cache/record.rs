use ferrous_mdns_domain::DnsRecord;

#[derive(Debug, Clone)]
pub struct CachedRecord {
    pub record: DnsRecord,
    /// Set by a goodbye; the record only lingers for the grace period.
    pub withdrawn: bool,
}

impl CachedRecord {
    pub fn new(record: DnsRecord) -> Self {
        Self {
            record,
            withdrawn: false,
        }
    }

    #[inline(always)]
    pub fn is_live(&self, now: u64) -> bool {
        !self.withdrawn && !self.record.is_expired(now)
    }
}
