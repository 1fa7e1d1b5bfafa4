use ferrous_mdns_domain::ServiceEvent;

/// Receives Added/Removed/Updated transitions from a browser.
///
/// Called from the browser task; implementations must not block.
pub trait ServiceListener: Send + Sync {
    fn on_service_state_change(&self, event: &ServiceEvent);
}

impl<F> ServiceListener for F
where
    F: Fn(&ServiceEvent) + Send + Sync,
{
    fn on_service_state_change(&self, event: &ServiceEvent) {
        self(event)
    }
}
