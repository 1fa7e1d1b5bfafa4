use ferrous_mdns_application::ports::ServiceListener;
use ferrous_mdns_domain::ServiceEvent;
use tokio::sync::mpsc;

/// Listener that forwards browser events into a channel.
#[derive(Clone)]
pub struct ServiceEventEmitter {
    sender: Option<mpsc::UnboundedSender<ServiceEvent>>,
}

impl ServiceEventEmitter {
    pub fn new_disabled() -> Self {
        Self { sender: None }
    }

    pub fn new_enabled() -> (Self, mpsc::UnboundedReceiver<ServiceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = Self { sender: Some(tx) };
        (emitter, rx)
    }

    pub fn emit(&self, event: ServiceEvent) {
        if let Some(ref tx) = self.sender {
            let _ = tx.send(event);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }
}

impl ServiceListener for ServiceEventEmitter {
    fn on_service_state_change(&self, event: &ServiceEvent) {
        self.emit(event.clone());
    }
}

impl Default for ServiceEventEmitter {
    fn default() -> Self {
        Self::new_disabled()
    }
}

impl std::fmt::Debug for ServiceEventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEventEmitter")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
