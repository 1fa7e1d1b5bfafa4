use ferrous_mdns_application::ports::{InterfaceChange, ServiceListener};
use ferrous_mdns_domain::{ServiceEvent, ServiceStateChange};
use std::sync::{Arc, Mutex};

#[test]
fn test_closure_is_a_service_listener() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener: Arc<dyn ServiceListener> = Arc::new(move |event: &ServiceEvent| {
        sink.lock().unwrap().push(event.state);
    });

    listener.on_service_state_change(&ServiceEvent::new(
        "_http._tcp.local.",
        "Web._http._tcp.local.",
        ServiceStateChange::Added,
    ));
    listener.on_service_state_change(&ServiceEvent::new(
        "_http._tcp.local.",
        "Web._http._tcp.local.",
        ServiceStateChange::Removed,
    ));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![ServiceStateChange::Added, ServiceStateChange::Removed]
    );
}

#[test]
fn test_interface_change_is_empty_without_additions_or_removals() {
    assert!(InterfaceChange::default().is_empty());

    let change = InterfaceChange {
        added: vec!["10.0.0.1".parse().unwrap()],
        removed: Vec::new(),
    };
    assert!(!change.is_empty());
}
