//! `MdnsTransport` implementations.
//!
//! `UdpMulticastTransport` talks to the real link; `LoopbackNetwork` wires
//! several engines together in-process; `RecordingTransport` only captures
//! what an engine sends.

pub mod loopback;
pub mod recording;
pub mod udp;

pub use loopback::{LoopbackNetwork, LoopbackTransport};
pub use recording::{RecordingTransport, SentPacket};
pub use udp::UdpMulticastTransport;

use ferrous_mdns_application::ports::InterfaceChange;
use std::net::IpAddr;

/// Difference between the current and the wanted interface sets.
pub(crate) fn interface_diff(current: &[IpAddr], wanted: &[IpAddr]) -> InterfaceChange {
    InterfaceChange {
        added: wanted
            .iter()
            .filter(|ip| !current.contains(ip))
            .copied()
            .collect(),
        removed: current
            .iter()
            .filter(|ip| !wanted.contains(ip))
            .copied()
            .collect(),
    }
}
