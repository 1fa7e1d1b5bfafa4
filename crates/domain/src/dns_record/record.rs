use super::entry::{DnsEntry, CLASS_IN, CLASS_UNIQUE};
use super::RecordType;
use crate::clock::now_millis;
use smallvec::SmallVec;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Record payloads, one variant per record family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordData {
    /// Raw address bytes: 4 for A, 16 for AAAA.
    Address(SmallVec<[u8; 16]>),
    Pointer(String),
    /// Length-prefixed character strings, exactly as carried on the wire.
    Text(Vec<u8>),
    Service {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    HostInfo {
        cpu: String,
        os: String,
    },
    Unknown(Vec<u8>),
}

impl RecordData {
    pub fn from_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => RecordData::Address(SmallVec::from_slice(&v4.octets())),
            IpAddr::V6(v6) => RecordData::Address(SmallVec::from_slice(&v6.octets())),
        }
    }

    pub fn ip_addr(&self) -> Option<IpAddr> {
        let RecordData::Address(bytes) = self else {
            return None;
        };
        match bytes.len() {
            4 => {
                let octets: [u8; 4] = bytes.as_slice().try_into().ok()?;
                Some(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            16 => {
                let octets: [u8; 16] = bytes.as_slice().try_into().ok()?;
                Some(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            _ => None,
        }
    }
}

/// A resource record stamped with the monotonic time it was created or last
/// refreshed.
///
/// Two records have the same identity when name, type, masked class and data
/// match; TTL and creation time never take part in identity.
#[derive(Debug, Clone)]
pub struct DnsRecord {
    pub entry: DnsEntry,
    pub ttl: u32,
    pub created: u64,
    pub data: RecordData,
}

impl DnsRecord {
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        class: u16,
        ttl: u32,
        data: RecordData,
    ) -> Self {
        Self {
            entry: DnsEntry::new(name, record_type, class),
            ttl,
            created: now_millis(),
            data,
        }
    }

    pub fn address(name: impl Into<String>, ip: IpAddr, ttl: u32) -> Self {
        let record_type = if ip.is_ipv4() {
            RecordType::A
        } else {
            RecordType::AAAA
        };
        Self::new(
            name,
            record_type,
            CLASS_IN | CLASS_UNIQUE,
            ttl,
            RecordData::from_ip(ip),
        )
    }

    pub fn pointer(name: impl Into<String>, alias: impl Into<String>, ttl: u32) -> Self {
        Self::new(
            name,
            RecordType::PTR,
            CLASS_IN,
            ttl,
            RecordData::Pointer(alias.into()),
        )
    }

    pub fn text(name: impl Into<String>, text: Vec<u8>, ttl: u32) -> Self {
        Self::new(
            name,
            RecordType::TXT,
            CLASS_IN | CLASS_UNIQUE,
            ttl,
            RecordData::Text(text),
        )
    }

    pub fn service(
        name: impl Into<String>,
        priority: u16,
        weight: u16,
        port: u16,
        target: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self::new(
            name,
            RecordType::SRV,
            CLASS_IN | CLASS_UNIQUE,
            ttl,
            RecordData::Service {
                priority,
                weight,
                port,
                target: target.into(),
            },
        )
    }

    pub fn host_info(
        name: impl Into<String>,
        cpu: impl Into<String>,
        os: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self::new(
            name,
            RecordType::HINFO,
            CLASS_IN | CLASS_UNIQUE,
            ttl,
            RecordData::HostInfo {
                cpu: cpu.into(),
                os: os.into(),
            },
        )
    }

    pub fn with_created(mut self, created: u64) -> Self {
        self.created = created;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.entry.name
    }

    #[inline]
    pub fn record_type(&self) -> RecordType {
        self.entry.record_type
    }

    /// Target of a PTR record.
    pub fn alias(&self) -> Option<&str> {
        match &self.data {
            RecordData::Pointer(alias) => Some(alias),
            _ => None,
        }
    }

    #[inline]
    pub fn same_identity(&self, other: &DnsRecord) -> bool {
        self.entry.same_key(&other.entry) && self.data == other.data
    }

    /// Known-answer rule: the asker already holds this record with more than
    /// half of our TTL left.
    pub fn suppressed_by_answer(&self, known: &DnsRecord) -> bool {
        self.same_identity(known) && u64::from(known.ttl) * 2 > u64::from(self.ttl)
    }

    /// Monotonic millisecond at which `percent` of the lifetime has elapsed.
    #[inline]
    pub fn expiration_time(&self, percent: u32) -> u64 {
        self.created + u64::from(self.ttl) * u64::from(percent) * 10
    }

    #[inline]
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiration_time(100)
    }

    #[inline]
    pub fn is_stale(&self, now: u64) -> bool {
        now >= self.expiration_time(50)
    }

    /// Whole seconds of lifetime left at `now`.
    pub fn remaining_ttl(&self, now: u64) -> u32 {
        (self.expiration_time(100).saturating_sub(now) / 1000) as u32
    }

    #[inline]
    pub fn is_goodbye(&self) -> bool {
        self.ttl == 0
    }

    /// Adopt the lifetime of a fresher copy of the same record.
    pub fn reset_ttl(&mut self, other: &DnsRecord) {
        self.created = other.created;
        self.ttl = other.ttl;
    }
}

impl PartialEq for DnsRecord {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other) && self.ttl == other.ttl
    }
}

impl Eq for DnsRecord {}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} class={} ttl={}",
            self.entry.name, self.entry.record_type, self.entry.class, self.ttl
        )?;
        match &self.data {
            RecordData::Address(_) => match self.data.ip_addr() {
                Some(ip) => write!(f, " {}", ip),
                None => write!(f, " <malformed address>"),
            },
            RecordData::Pointer(alias) => write!(f, " -> {}", alias),
            RecordData::Text(text) => write!(f, " ({} bytes)", text.len()),
            RecordData::Service {
                priority,
                weight,
                port,
                target,
            } => write!(f, " {} {} {} {}", priority, weight, port, target),
            RecordData::HostInfo { cpu, os } => write!(f, " {} {}", cpu, os),
            RecordData::Unknown(raw) => write!(f, " <{} raw bytes>", raw.len()),
        }
    }
}
