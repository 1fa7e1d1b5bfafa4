use async_trait::async_trait;
use ferrous_mdns_application::ports::{InterfaceChange, MdnsTransport, ReceivedPacket};
use ferrous_mdns_domain::{DomainError, InterfaceChoice};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct SentPacket {
    pub data: Vec<u8>,
    pub destination: SocketAddr,
}

/// Transport that never receives and keeps every datagram it is asked to send.
pub struct RecordingTransport {
    sent: Mutex<Vec<SentPacket>>,
    interfaces: Mutex<Vec<IpAddr>>,
    failing: AtomicBool,
    closed: CancellationToken,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            interfaces: Mutex::new(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]),
            failing: AtomicBool::new(false),
            closed: CancellationToken::new(),
        }
    }

    pub fn sent(&self) -> Vec<SentPacket> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take_sent(&self) -> Vec<SentPacket> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Make every following send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::Relaxed);
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MdnsTransport for RecordingTransport {
    async fn send(&self, packet: &[u8], destination: SocketAddr) -> Result<(), DomainError> {
        if self.closed.is_cancelled() {
            return Err(DomainError::TransportClosed);
        }
        if self.failing.load(AtomicOrdering::Relaxed) {
            return Err(DomainError::Transport("simulated send failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentPacket {
                data: packet.to_vec(),
                destination,
            });
        Ok(())
    }

    async fn recv(&self) -> Option<ReceivedPacket> {
        self.closed.cancelled().await;
        None
    }

    async fn set_interfaces(
        &self,
        choice: InterfaceChoice,
    ) -> Result<InterfaceChange, DomainError> {
        let wanted = match choice {
            InterfaceChoice::All | InterfaceChoice::Default => {
                vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]
            }
            InterfaceChoice::List(addrs) => addrs,
        };
        let mut interfaces = self.interfaces.lock().unwrap_or_else(|e| e.into_inner());
        let change = super::interface_diff(&interfaces, &wanted);
        *interfaces = wanted;
        Ok(change)
    }

    fn active_interfaces(&self) -> Vec<IpAddr> {
        self.interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn close(&self) {
        self.closed.cancel();
    }

    fn transport_name(&self) -> &'static str {
        "recording"
    }
}
