pub mod browser;
pub mod cache;
pub mod cache_maintenance;
pub mod engine;
pub mod events;
pub mod log_backoff;
pub mod registry;
pub mod service_lookup;
pub mod signal;
pub mod transport;
pub mod wire;

pub use browser::ServiceBrowser;
pub use cache::{CacheUpdate, CachedRecord, RecordCache};
pub use cache_maintenance::RecordCacheMaintenance;
pub use engine::{EngineStats, EngineStatsSnapshot, MdnsEngine};
pub use events::ServiceEventEmitter;
pub use log_backoff::{LogBackoff, LogSeverity};
pub use registry::{QueryAnswer, ServiceRegistry};
pub use signal::ChangeSignal;
pub use transport::{LoopbackNetwork, LoopbackTransport, RecordingTransport, UdpMulticastTransport};
pub use wire::{DnsIncoming, DnsOutgoing};
