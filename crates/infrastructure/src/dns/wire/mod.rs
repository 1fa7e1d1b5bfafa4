//! mDNS message codec (RFC 1035 §4.1, RFC 6762 §18).
//!
//! Pure byte work: no sockets, no clocks beyond the creation stamp handed to
//! decoded records.

mod incoming;
mod outgoing;

pub use incoming::DnsIncoming;
pub use outgoing::{DnsOutgoing, EncodedPacket, SectionCursor};

pub use ferrous_mdns_domain::config::MAX_MSG_ABSOLUTE;

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

pub const MDNS_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
pub const MDNS_PORT: u16 = 5353;
pub const MDNS_SOCKET_ADDR: SocketAddr = SocketAddr::V4(SocketAddrV4::new(MDNS_ADDR, MDNS_PORT));

pub const HEADER_LEN: usize = 12;

/// Payload that fits a standard Ethernet MTU.
pub const MAX_MSG_TYPICAL: usize = 1460;

pub const FLAGS_QR_MASK: u16 = 0x8000;
pub const FLAGS_QR_QUERY: u16 = 0x0000;
pub const FLAGS_QR_RESPONSE: u16 = 0x8000;
pub const FLAGS_AA: u16 = 0x0400;
pub const FLAGS_TC: u16 = 0x0200;
