#![allow(dead_code)]
use ferrous_mdns_domain::dns_record::CLASS_IN;
use ferrous_mdns_domain::{
    DnsQuestion, DnsRecord, MdnsConfig, RecordType, ServiceInfo, TxtProperties,
};
use ferrous_mdns_infrastructure::dns::transport::RecordingTransport;
use ferrous_mdns_infrastructure::dns::{DnsIncoming, DnsOutgoing};
use std::net::SocketAddr;
use std::time::Duration;

pub const TEST_TYPE: &str = "_test._tcp.local.";

/// Protocol timing shrunk so a full register/browse cycle takes well under a second.
pub fn fast_config() -> MdnsConfig {
    MdnsConfig {
        probe_count: 2,
        probe_interval_ms: 10,
        announce_count: 2,
        announce_interval_ms: 20,
        goodbye_count: 2,
        goodbye_interval_ms: 10,
        browser_initial_interval_ms: 100,
        browser_max_interval_ms: 400,
        query_jitter_ms: [0, 5],
        lookup_initial_interval_ms: 50,
        ..MdnsConfig::default()
    }
}

pub fn test_service(instance: &str) -> ServiceInfo {
    let mut properties = TxtProperties::new();
    properties.insert("path", "/index.html");
    ServiceInfo::new(TEST_TYPE, format!("{}.{}", instance, TEST_TYPE))
        .with_address("10.0.0.42".parse().unwrap())
        .with_port(8080)
        .with_server("testhost.local.")
        .with_properties(properties)
        .unwrap()
}

pub fn peer() -> SocketAddr {
    "10.0.0.9:5353".parse().unwrap()
}

pub fn query_bytes(name: &str, record_type: RecordType, known: Vec<DnsRecord>) -> Vec<u8> {
    let mut out = DnsOutgoing::query();
    out.add_question(DnsQuestion::new(name, record_type, CLASS_IN));
    for record in known {
        out.add_answer_at_time(record, None);
    }
    out.packet().unwrap()
}

pub fn response_bytes(records: Vec<DnsRecord>) -> Vec<u8> {
    let mut out = DnsOutgoing::response();
    for record in records {
        out.add_answer_at_time(record, None);
    }
    out.packet().unwrap()
}

/// Every datagram the transport was asked to send, decoded.
pub fn sent_messages(transport: &RecordingTransport) -> Vec<(DnsIncoming, SocketAddr)> {
    transport
        .take_sent()
        .into_iter()
        .map(|packet| (DnsIncoming::parse(&packet.data), packet.destination))
        .collect()
}

pub async fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
