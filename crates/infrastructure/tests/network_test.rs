//! Engines talking to each other over the in-process multicast bus.
mod helpers;

use ferrous_mdns_domain::{
    DnsRecord, DomainError, InterfaceChoice, MdnsConfig, RecordType, ServiceEvent,
    ServiceStateChange, TxtProperties,
};
use ferrous_mdns_infrastructure::dns::transport::{LoopbackNetwork, RecordingTransport};
use ferrous_mdns_infrastructure::dns::wire::{FLAGS_TC, MDNS_SOCKET_ADDR};
use ferrous_mdns_infrastructure::dns::{DnsIncoming, MdnsEngine, ServiceEventEmitter};
use helpers::{fast_config, test_service, wait_until, TEST_TYPE};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn two_hosts() -> (Arc<MdnsEngine>, Arc<MdnsEngine>) {
    let network = LoopbackNetwork::new();
    let publisher = MdnsEngine::start(fast_config(), Arc::new(network.attach())).unwrap();
    let browser = MdnsEngine::start(fast_config(), Arc::new(network.attach())).unwrap();
    (publisher, browser)
}

async fn next_event(events: &mut UnboundedReceiver<ServiceEvent>) -> ServiceEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("event in time")
        .expect("channel open")
}

#[tokio::test]
async fn test_browser_sees_service_come_and_go() {
    let (publisher, host) = two_hosts();
    let (emitter, mut events) = ServiceEventEmitter::new_enabled();
    let browser = host.browse(TEST_TYPE, Arc::new(emitter)).unwrap();

    let mut info = test_service("Web");
    publisher
        .register_service(&mut info, Some(120), false)
        .await
        .unwrap();

    let added = next_event(&mut events).await;
    assert_eq!(added.state, ServiceStateChange::Added);
    assert_eq!(added.name, "Web._test._tcp.local.");
    assert_eq!(added.service_type, TEST_TYPE);

    publisher.unregister_service(&info).await.unwrap();

    let removed = next_event(&mut events).await;
    assert_eq!(removed.state, ServiceStateChange::Removed);
    assert_eq!(removed.name, "Web._test._tcp.local.");

    browser.stop().await;
    publisher.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_browser_reports_changed_txt_as_update() {
    let (publisher, host) = two_hosts();
    let (emitter, mut events) = ServiceEventEmitter::new_enabled();
    let _browser = host.browse(TEST_TYPE, Arc::new(emitter)).unwrap();

    let mut info = test_service("Web");
    publisher
        .register_service(&mut info, Some(120), false)
        .await
        .unwrap();
    assert_eq!(next_event(&mut events).await.state, ServiceStateChange::Added);

    let mut properties = TxtProperties::new();
    properties.insert("path", "/changed");
    info.set_properties(properties).unwrap();
    publisher.update_service(&info).await.unwrap();

    let updated = next_event(&mut events).await;
    assert_eq!(updated.state, ServiceStateChange::Updated);
    assert_eq!(updated.name, info.name);

    publisher.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_second_host_renames_on_conflict() {
    let (first, second) = two_hosts();
    let mut original = test_service("Printer");
    first
        .register_service(&mut original, Some(120), false)
        .await
        .unwrap();

    let mut contender = test_service("Printer").with_server("otherhost.local.");
    second
        .register_service(&mut contender, Some(120), true)
        .await
        .unwrap();

    assert_eq!(original.name, "Printer._test._tcp.local.");
    assert_eq!(contender.name, "Printer-2._test._tcp.local.");

    first.close().await;
    second.close().await;
}

#[tokio::test]
async fn test_service_lookup_resolves_full_info() {
    let (publisher, host) = two_hosts();
    let mut info = test_service("Web");
    publisher
        .register_service(&mut info, Some(120), false)
        .await
        .unwrap();

    let resolved = host
        .get_service_info(TEST_TYPE, &info.name, WAIT)
        .await
        .unwrap()
        .expect("service resolved");

    assert_eq!(resolved.port, 8080);
    assert_eq!(resolved.server, "testhost.local.");
    assert_eq!(resolved.address, info.address);
    assert_eq!(
        resolved.properties.get("path").and_then(|v| v.as_str()),
        Some("/index.html")
    );

    publisher.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_service_lookup_times_out_with_none() {
    let (publisher, host) = two_hosts();

    let resolved = host
        .get_service_info(
            TEST_TYPE,
            "Nobody._test._tcp.local.",
            Duration::from_millis(200),
        )
        .await
        .unwrap();

    assert!(resolved.is_none());
    publisher.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_service_lookup_without_practical_deadline_waits_for_service() {
    let (publisher, host) = two_hosts();
    let lookup = tokio::spawn({
        let host = Arc::clone(&host);
        async move {
            host.get_service_info(TEST_TYPE, "Web._test._tcp.local.", Duration::MAX)
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut info = test_service("Web");
    publisher
        .register_service(&mut info, Some(120), false)
        .await
        .unwrap();

    let resolved = timeout(WAIT, lookup)
        .await
        .expect("lookup finished in time")
        .expect("lookup task did not panic")
        .unwrap()
        .expect("service resolved");
    assert_eq!(resolved.port, 8080);

    publisher.close().await;
    host.close().await;
}

#[tokio::test]
async fn test_service_lookup_rejects_name_of_other_type() {
    let (_publisher, host) = two_hosts();

    let result = host
        .get_service_info(TEST_TYPE, "Web._ipp._tcp.local.", Duration::from_millis(50))
        .await;

    assert!(matches!(result, Err(DomainError::BadTypeInName(_))));
}

#[tokio::test]
async fn test_browse_of_invalid_type_fails() {
    let (_publisher, host) = two_hosts();
    let result = host.browse("not-a-type", Arc::new(ServiceEventEmitter::new_disabled()));
    assert!(result.is_err());
}

#[tokio::test]
async fn test_browser_stops_when_engine_closes() {
    let (_publisher, host) = two_hosts();
    let browser = host
        .browse(TEST_TYPE, Arc::new(ServiceEventEmitter::new_disabled()))
        .unwrap();

    host.close().await;

    assert!(wait_until(|| !browser.is_running(), WAIT).await);
    assert!(host
        .browse(TEST_TYPE, Arc::new(ServiceEventEmitter::new_disabled()))
        .is_err());
}

#[tokio::test]
async fn test_large_known_answer_list_splits_within_packet_limit() {
    let transport = Arc::new(RecordingTransport::new());
    let config = MdnsConfig {
        max_packet_size: 1460,
        ..fast_config()
    };
    let engine = MdnsEngine::new(config, transport.clone()).unwrap();
    for i in 0..300 {
        engine.cache().add(DnsRecord::pointer(
            TEST_TYPE,
            format!("A fairly long instance name number {}._test._tcp.local.", i),
            3600,
        ));
    }

    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    let _browser = engine
        .browse(
            TEST_TYPE,
            Arc::new(move |_: &ServiceEvent| {
                *counter.lock().unwrap() += 1;
            }),
        )
        .unwrap();

    assert!(wait_until(|| !transport.sent().is_empty(), WAIT).await);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let packets = transport.sent();
    let queries: Vec<_> = packets
        .iter()
        .filter(|packet| DnsIncoming::parse(&packet.data).is_query())
        .take_while(|packet| packet.destination == MDNS_SOCKET_ADDR)
        .collect();
    let split = queries
        .iter()
        .position(|packet| {
            let flags = u16::from_be_bytes([packet.data[2], packet.data[3]]);
            flags & FLAGS_TC == 0
        })
        .expect("a final packet without TC");

    assert!(split > 0);
    assert!(queries.iter().all(|packet| packet.data.len() <= 1460));
    let known: usize = queries[..=split]
        .iter()
        .map(|packet| DnsIncoming::parse(&packet.data).answers.len())
        .sum();
    assert_eq!(known, 300);
    assert_eq!(*seen.lock().unwrap(), 300);
    let first = DnsIncoming::parse(&queries[0].data);
    assert_eq!(first.questions[0].record_type, RecordType::PTR);
}

#[tokio::test]
async fn test_interface_change_triggers_immediate_requery() {
    let transport = Arc::new(RecordingTransport::new());
    let config = MdnsConfig {
        browser_initial_interval_ms: 60_000,
        browser_max_interval_ms: 60_000,
        ..fast_config()
    };
    let engine = MdnsEngine::new(config, transport.clone()).unwrap();
    let _browser = engine
        .browse(TEST_TYPE, Arc::new(ServiceEventEmitter::new_disabled()))
        .unwrap();
    assert!(wait_until(|| transport.sent().len() == 1, WAIT).await);

    engine
        .update_interfaces(InterfaceChoice::List(vec!["192.168.7.2".parse().unwrap()]))
        .await
        .unwrap();

    assert!(wait_until(|| transport.sent().len() == 2, Duration::from_secs(1)).await);
    engine.close().await;
}

#[tokio::test]
async fn test_browser_refreshes_tracked_instance_before_it_expires() {
    let transport = Arc::new(RecordingTransport::new());
    let config = MdnsConfig {
        browser_initial_interval_ms: 60_000,
        browser_max_interval_ms: 60_000,
        ..fast_config()
    };
    let engine = MdnsEngine::new(config, transport.clone()).unwrap();
    let started = std::time::Instant::now();
    engine
        .cache()
        .add(DnsRecord::pointer(TEST_TYPE, "Short._test._tcp.local.", 2));

    let _browser = engine
        .browse(TEST_TYPE, Arc::new(ServiceEventEmitter::new_disabled()))
        .unwrap();

    assert!(wait_until(|| transport.sent().len() >= 2, WAIT).await);
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert!(wait_until(|| transport.sent().len() >= 4, WAIT).await);
    assert!(started.elapsed() < Duration::from_millis(2500));

    let queries: Vec<DnsIncoming> = transport
        .sent()
        .iter()
        .map(|packet| DnsIncoming::parse(&packet.data))
        .collect();
    assert!(queries.iter().all(|query| query.is_query()
        && query.questions[0].record_type == RecordType::PTR));
    // fresh at first, past half its lifetime for every refresh
    assert_eq!(queries[0].answers.len(), 1);
    assert!(queries[0].answers[0].ttl >= 1);
    assert!(queries[1..].iter().all(|query| query.answers.is_empty()));

    engine.close().await;
}
