use async_trait::async_trait;
use ferrous_mdns_domain::{DomainError, InterfaceChoice};
use std::net::{IpAddr, SocketAddr};

/// A datagram as it came off the wire.
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    pub data: Vec<u8>,
    pub source: SocketAddr,
}

/// Interfaces joined and left by a membership change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InterfaceChange {
    pub added: Vec<IpAddr>,
    pub removed: Vec<IpAddr>,
}

impl InterfaceChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Owner of the sockets and multicast memberships used by an engine.
#[async_trait]
pub trait MdnsTransport: Send + Sync {
    /// Send one datagram on every active interface.
    async fn send(&self, packet: &[u8], destination: SocketAddr) -> Result<(), DomainError>;

    /// Wait for the next datagram; `None` once the transport is closed.
    async fn recv(&self) -> Option<ReceivedPacket>;

    /// Re-resolve `choice` and switch memberships to the result.
    async fn set_interfaces(&self, choice: InterfaceChoice)
        -> Result<InterfaceChange, DomainError>;

    fn active_interfaces(&self) -> Vec<IpAddr>;

    async fn close(&self);

    fn transport_name(&self) -> &'static str;
}
