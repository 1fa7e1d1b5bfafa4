use crate::dns_record::{DnsRecord, RecordType, CLASS_ANY, CLASS_MASK, CLASS_UNIQUE};

/// A question as carried in the first section of a message.
///
/// Equality includes the raw class field, so a question asking for a unicast
/// response (top class bit) differs from the same question without it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsQuestion {
    pub name: String,
    pub record_type: RecordType,
    pub class: u16,
}

impl DnsQuestion {
    pub fn new(name: impl Into<String>, record_type: RecordType, class: u16) -> Self {
        Self {
            name: name.into(),
            record_type,
            class,
        }
    }

    pub fn wants_unicast_response(&self) -> bool {
        self.class & CLASS_UNIQUE != 0
    }

    pub fn answered_by(&self, record: &DnsRecord) -> bool {
        let class = self.class & CLASS_MASK;
        (class == CLASS_ANY || class == record.entry.class)
            && self.record_type.matches(record.record_type())
            && self.name.eq_ignore_ascii_case(record.name())
    }
}
