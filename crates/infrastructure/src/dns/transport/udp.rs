//! Multicast UDP transport (RFC 6762 §3, §11).
//!
//! One socket bound to `0.0.0.0:5353` with address/port reuse so that other
//! responders on the host can coexist. Group membership is per interface;
//! outgoing multicast is sent once per active interface.

use super::interface_diff;
use crate::dns::wire::{MAX_MSG_ABSOLUTE, MDNS_ADDR, MDNS_PORT};
use async_trait::async_trait;
use ferrous_mdns_application::ports::{InterfaceChange, MdnsTransport, ReceivedPacket};
use ferrous_mdns_domain::{DomainError, InterfaceChoice};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::RwLock;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// IP TTL for every outgoing mDNS packet (RFC 6762 §11).
const MULTICAST_TTL: u32 = 255;

pub struct UdpMulticastTransport {
    socket: UdpSocket,
    interfaces: RwLock<Vec<IpAddr>>,
    // the outgoing interface is socket state; one sender at a time
    send_lock: Mutex<()>,
    closed: CancellationToken,
}

impl UdpMulticastTransport {
    pub async fn bind(choice: InterfaceChoice) -> Result<Self, DomainError> {
        Self::bind_port(MDNS_PORT, choice).await
    }

    pub async fn bind_port(port: u16, choice: InterfaceChoice) -> Result<Self, DomainError> {
        let socket = create_multicast_socket(port)
            .map_err(|e| DomainError::Transport(format!("Failed to bind port {}: {}", port, e)))?;

        let transport = Self {
            socket,
            interfaces: RwLock::new(Vec::new()),
            send_lock: Mutex::new(()),
            closed: CancellationToken::new(),
        };
        let change = transport.set_interfaces(choice).await?;

        info!(
            port,
            interfaces = change.added.len(),
            "Multicast transport ready"
        );
        Ok(transport)
    }

    fn join(&self, ip: Ipv4Addr) -> std::io::Result<()> {
        SockRef::from(&self.socket).join_multicast_v4(&MDNS_ADDR, &ip)
    }

    fn leave(&self, ip: Ipv4Addr) -> std::io::Result<()> {
        SockRef::from(&self.socket).leave_multicast_v4(&MDNS_ADDR, &ip)
    }
}

fn create_multicast_socket(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_multicast_loop_v4(true)?;
    socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
    let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&bind_addr.into())?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Expand an interface choice into concrete IPv4 interface addresses.
pub fn resolve_interfaces(choice: &InterfaceChoice) -> Vec<IpAddr> {
    match choice {
        InterfaceChoice::Default => vec![IpAddr::V4(Ipv4Addr::UNSPECIFIED)],
        InterfaceChoice::List(addrs) => addrs
            .iter()
            .filter(|ip| {
                if ip.is_ipv6() {
                    debug!(interface = %ip, "Skipping IPv6 interface");
                }
                ip.is_ipv4()
            })
            .copied()
            .collect(),
        InterfaceChoice::All => {
            let Ok(interfaces) = if_addrs::get_if_addrs() else {
                return vec![IpAddr::V4(Ipv4Addr::UNSPECIFIED)];
            };
            let mut ips: Vec<IpAddr> = interfaces
                .iter()
                .filter(|iface| iface.ip().is_ipv4() && !iface.is_loopback())
                .map(|iface| iface.ip())
                .collect();
            if ips.is_empty() {
                ips.push(IpAddr::V4(Ipv4Addr::LOCALHOST));
            }
            ips.sort();
            ips.dedup();
            ips
        }
    }
}

#[async_trait]
impl MdnsTransport for UdpMulticastTransport {
    async fn send(&self, packet: &[u8], destination: SocketAddr) -> Result<(), DomainError> {
        if self.closed.is_cancelled() {
            return Err(DomainError::TransportClosed);
        }

        if !destination.ip().is_multicast() {
            self.socket.send_to(packet, destination).await?;
            return Ok(());
        }

        let interfaces = self.active_interfaces();
        let _guard = self.send_lock.lock().await;
        let mut first_error = None;
        for ip in interfaces {
            let IpAddr::V4(v4) = ip else { continue };
            let sent = match SockRef::from(&self.socket).set_multicast_if_v4(&v4) {
                Ok(()) => self.socket.send_to(packet, destination).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                first_error.get_or_insert(DomainError::Transport(format!(
                    "Send on interface {} failed: {}",
                    v4, e
                )));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn recv(&self) -> Option<ReceivedPacket> {
        let mut buf = vec![0u8; MAX_MSG_ABSOLUTE];
        loop {
            tokio::select! {
                _ = self.closed.cancelled() => return None,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, source)) => {
                        return Some(ReceivedPacket {
                            data: buf[..len].to_vec(),
                            source,
                        });
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!(error = %e, "Multicast receive error");
                        continue;
                    }
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

        let wanted = resolve_interfaces(&choice);
        let current = self.active_interfaces();
        let mut change = interface_diff(&current, &wanted);

        change.added.retain(|ip| {
            let IpAddr::V4(v4) = ip else { return false };
            match self.join(*v4) {
                Ok(()) => true,
                Err(e) => {
                    warn!(interface = %v4, error = %e, "Failed to join mDNS group");
                    false
                }
            }
        });
        for ip in &change.removed {
            if let IpAddr::V4(v4) = ip {
                if let Err(e) = self.leave(*v4) {
                    debug!(interface = %v4, error = %e, "Failed to leave mDNS group");
                }
            }
        }

        let mut interfaces = self.interfaces.write().unwrap_or_else(|e| e.into_inner());
        interfaces.retain(|ip| !change.removed.contains(ip));
        interfaces.extend(change.added.iter().copied());
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
        "udp-multicast"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_choice_uses_the_any_address() {
        assert_eq!(
            resolve_interfaces(&InterfaceChoice::Default),
            vec![IpAddr::V4(Ipv4Addr::UNSPECIFIED)]
        );
    }

    #[test]
    fn explicit_list_keeps_only_ipv4() {
        let choice = InterfaceChoice::List(vec![
            "192.168.1.10".parse().unwrap(),
            "fe80::1".parse().unwrap(),
        ]);
        assert_eq!(
            resolve_interfaces(&choice),
            vec!["192.168.1.10".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn all_resolves_to_at_least_one_interface() {
        assert!(!resolve_interfaces(&InterfaceChoice::All).is_empty());
    }
}
