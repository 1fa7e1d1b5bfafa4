use compact_str::CompactString;
use ferrous_mdns_domain::{DnsEntry, RecordType};

/// Bucket key: lowercased name plus record type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub name: CompactString,
    pub record_type: RecordType,
}

impl CacheKey {
    #[inline]
    pub fn new(name: &str, record_type: RecordType) -> Self {
        Self {
            name: CompactString::from(name.to_ascii_lowercase()),
            record_type,
        }
    }

    #[inline]
    pub fn for_entry(entry: &DnsEntry) -> Self {
        Self::new(&entry.name, entry.record_type)
    }
}
