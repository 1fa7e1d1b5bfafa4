mod cache_maintenance_port;
mod interface_monitor_port;
mod mdns_transport;
mod service_listener;

pub use cache_maintenance_port::{CacheMaintenancePort, CacheReapOutcome};
pub use interface_monitor_port::{InterfaceMonitorPort, InterfaceRefreshOutcome};
pub use mdns_transport::{InterfaceChange, MdnsTransport, ReceivedPacket};
pub use service_listener::ServiceListener;
