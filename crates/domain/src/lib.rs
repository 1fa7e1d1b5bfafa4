//! Ferrous mDNS Domain Layer
pub mod clock;
pub mod config;
pub mod dns_question;
pub mod dns_record;
pub mod errors;
pub mod interface;
pub mod service_event;
pub mod service_info;
pub mod service_name;
pub mod txt_properties;

pub use config::{CliOverrides, Config, ConfigError, LoggingConfig, MdnsConfig};
pub use dns_question::DnsQuestion;
pub use dns_record::{DnsEntry, DnsRecord, RecordData, RecordType};
pub use errors::DomainError;
pub use interface::InterfaceChoice;
pub use service_event::{ServiceEvent, ServiceStateChange};
pub use service_info::{ServiceInfo, DEFAULT_TTL};
pub use service_name::{service_type_name, SERVICE_TYPE_ENUMERATION};
pub use txt_properties::{PropertyValue, TxtProperties};
