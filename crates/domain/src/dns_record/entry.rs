use super::RecordType;

pub const CLASS_IN: u16 = 1;
pub const CLASS_NONE: u16 = 254;
pub const CLASS_ANY: u16 = 255;
pub const CLASS_MASK: u16 = 0x7FFF;
pub const CLASS_UNIQUE: u16 = 0x8000;

/// The (name, type, class) key shared by questions and records.
///
/// The class is stored with the cache-flush bit removed; the bit itself is
/// kept in `unique`. Equality ignores `unique` and compares names without
/// regard to ASCII case.
#[derive(Debug, Clone)]
pub struct DnsEntry {
    pub name: String,
    pub record_type: RecordType,
    pub class: u16,
    pub unique: bool,
}

impl DnsEntry {
    pub fn new(name: impl Into<String>, record_type: RecordType, class: u16) -> Self {
        Self {
            name: name.into(),
            record_type,
            class: class & CLASS_MASK,
            unique: class & CLASS_UNIQUE != 0,
        }
    }

    /// Lowercased name used as the cache and registry key.
    pub fn key(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    /// Class as written on the wire, with the cache-flush bit when requested.
    pub fn wire_class(&self, allow_flush: bool) -> u16 {
        if self.unique && allow_flush {
            self.class | CLASS_UNIQUE
        } else {
            self.class
        }
    }

    #[inline]
    pub fn same_key(&self, other: &DnsEntry) -> bool {
        self.record_type == other.record_type
            && self.class == other.class
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl PartialEq for DnsEntry {
    fn eq(&self, other: &Self) -> bool {
        self.same_key(other)
    }
}

impl Eq for DnsEntry {}
