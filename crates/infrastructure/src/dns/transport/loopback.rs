//! In-process multicast bus.
//!
//! Every transport attached to a `LoopbackNetwork` sees every multicast
//! datagram, its own included, the way a socket with multicast loop enabled
//! does. Unicast datagrams only reach the transport owning the destination.

use super::interface_diff;
use crate::dns::wire::MDNS_PORT;
use async_trait::async_trait;
use ferrous_mdns_application::ports::{InterfaceChange, MdnsTransport, ReceivedPacket};
use ferrous_mdns_domain::{DomainError, InterfaceChoice};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU8, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct Datagram {
    data: Arc<[u8]>,
    source: SocketAddr,
    destination: SocketAddr,
}

pub struct LoopbackNetwork {
    bus: broadcast::Sender<Datagram>,
    next_host: AtomicU8,
}

impl LoopbackNetwork {
    pub fn new() -> Arc<Self> {
        let (bus, _) = broadcast::channel(BUS_CAPACITY);
        Arc::new(Self {
            bus,
            next_host: AtomicU8::new(1),
        })
    }

    /// Attach a new host at the next free `10.0.0.x:5353`.
    pub fn attach(&self) -> LoopbackTransport {
        let host = self.next_host.fetch_add(1, AtomicOrdering::Relaxed);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, 0, host));
        self.attach_at(SocketAddr::new(ip, MDNS_PORT))
    }

    pub fn attach_at(&self, address: SocketAddr) -> LoopbackTransport {
        LoopbackTransport {
            address,
            bus: self.bus.clone(),
            receiver: Mutex::new(self.bus.subscribe()),
            interfaces: RwLock::new(vec![address.ip()]),
            closed: CancellationToken::new(),
        }
    }
}

pub struct LoopbackTransport {
    address: SocketAddr,
    bus: broadcast::Sender<Datagram>,
    receiver: Mutex<broadcast::Receiver<Datagram>>,
    interfaces: RwLock<Vec<IpAddr>>,
    closed: CancellationToken,
}

impl LoopbackTransport {
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    fn is_detached(&self) -> bool {
        self.interfaces
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }

    fn accepts(&self, datagram: &Datagram) -> bool {
        !self.is_detached()
            && (datagram.destination.ip().is_multicast() || datagram.destination == self.address)
    }
}

#[async_trait]
impl MdnsTransport for LoopbackTransport {
    async fn send(&self, packet: &[u8], destination: SocketAddr) -> Result<(), DomainError> {
        if self.closed.is_cancelled() {
            return Err(DomainError::TransportClosed);
        }
        if self.is_detached() {
            return Ok(());
        }
        // no subscribers is not an error on a shared medium
        let _ = self.bus.send(Datagram {
            data: Arc::from(packet),
            source: self.address,
            destination,
        });
        Ok(())
    }

    async fn recv(&self) -> Option<ReceivedPacket> {
        let mut receiver = self.receiver.lock().await;
        loop {
            tokio::select! {
                _ = self.closed.cancelled() => return None,
                received = receiver.recv() => match received {
                    Ok(datagram) if self.accepts(&datagram) => {
                        return Some(ReceivedPacket {
                            data: datagram.data.to_vec(),
                            source: datagram.source,
                        });
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(address = %self.address, skipped, "Loopback receiver lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    async fn set_interfaces(
        &self,
        choice: InterfaceChoice,
    ) -> Result<InterfaceChange, DomainError> {
        if self.closed.is_cancelled() {
            return Err(DomainError::TransportClosed);
        }
        let wanted = match choice {
            InterfaceChoice::All | InterfaceChoice::Default => vec![self.address.ip()],
            InterfaceChoice::List(addrs) => addrs,
        };
        let mut interfaces = self.interfaces.write().unwrap_or_else(|e| e.into_inner());
        let change = interface_diff(&interfaces, &wanted);
        *interfaces = wanted;
        Ok(change)
    }

    fn active_interfaces(&self) -> Vec<IpAddr> {
        self.interfaces
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn close(&self) {
        self.closed.cancel();
    }

    fn transport_name(&self) -> &'static str {
        "loopback"
    }
}
