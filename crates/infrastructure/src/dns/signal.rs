use tokio::sync::watch;

/// Fan-out wake-up for tasks sleeping on shared state.
///
/// Every `notify_all` bumps a generation counter; subscribers wake from
/// `changed()` and recompute whatever they were waiting for. Notifications
/// that arrive while a subscriber is busy collapse into one wake-up.
#[derive(Clone)]
pub struct ChangeSignal {
    sender: watch::Sender<u64>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self { sender }
    }

    pub fn notify_all(&self) {
        self.sender.send_modify(|generation| {
            *generation = generation.wrapping_add(1);
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sender.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.sender.borrow()
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSignal")
            .field("generation", &self.generation())
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wakes_every_subscriber() {
        let signal = ChangeSignal::new();
        let mut a = signal.subscribe();
        let mut b = signal.subscribe();

        signal.notify_all();

        tokio::time::timeout(Duration::from_secs(1), a.changed())
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), b.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal.generation(), 1);
    }

    #[tokio::test]
    async fn notifications_collapse_while_busy() {
        let signal = ChangeSignal::new();
        let mut rx = signal.subscribe();

        signal.notify_all();
        signal.notify_all();
        signal.notify_all();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 3);
        assert!(!rx.has_changed().unwrap());
    }
}
