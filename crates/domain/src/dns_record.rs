mod entry;
mod record;
mod record_type;

pub use entry::{DnsEntry, CLASS_ANY, CLASS_IN, CLASS_MASK, CLASS_NONE, CLASS_UNIQUE};
pub use record::{DnsRecord, RecordData};
pub use record_type::RecordType;
