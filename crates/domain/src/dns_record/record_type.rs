use std::fmt;
use std::str::FromStr;

/// Resource record types understood by the mDNS engine.
///
/// Anything else is carried as [`RecordType::Other`] and decoded as raw data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    PTR,
    HINFO,
    TXT,
    AAAA,
    SRV,
    ANY,
    Other(u16),
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::PTR => "PTR",
            RecordType::HINFO => "HINFO",
            RecordType::TXT => "TXT",
            RecordType::AAAA => "AAAA",
            RecordType::SRV => "SRV",
            RecordType::ANY => "ANY",
            RecordType::Other(_) => "OTHER",
        }
    }

    pub fn to_u16(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::PTR => 12,
            RecordType::HINFO => 13,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::ANY => 255,
            RecordType::Other(value) => *value,
        }
    }

    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            12 => RecordType::PTR,
            13 => RecordType::HINFO,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            255 => RecordType::ANY,
            other => RecordType::Other(other),
        }
    }

    /// True for the types whose answers are owned by a single host and are
    /// sent with the cache-flush bit.
    pub fn is_unique(&self) -> bool {
        matches!(
            self,
            RecordType::A
                | RecordType::AAAA
                | RecordType::SRV
                | RecordType::TXT
                | RecordType::HINFO
        )
    }

    /// Whether a question of this type is answered by a record of `other`.
    #[inline]
    pub fn matches(&self, other: RecordType) -> bool {
        *self == RecordType::ANY || *self == other
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Other(value) => write!(f, "TYPE{}", value),
            known => f.write_str(known.as_str()),
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "PTR" => Ok(RecordType::PTR),
            "HINFO" => Ok(RecordType::HINFO),
            "TXT" => Ok(RecordType::TXT),
            "AAAA" => Ok(RecordType::AAAA),
            "SRV" => Ok(RecordType::SRV),
            "ANY" => Ok(RecordType::ANY),
            other => other
                .strip_prefix("TYPE")
                .and_then(|n| n.parse::<u16>().ok())
                .map(RecordType::from_u16)
                .ok_or_else(|| format!("Unknown record type: {}", s)),
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        RecordType::from_u16(value)
    }
}
