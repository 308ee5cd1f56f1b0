//! Network reachability as published by the platform.

use std::sync::Arc;
use tokio::sync::watch;

/// Whether the remote can currently be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// Requests may succeed.
    Available,
    /// Requests will not reach the remote.
    Unavailable,
}

/// Broadcasts [`Connectivity`] changes.
///
/// Platform code calls [`ConnectivitySignal::set`]; the engine reads the
/// current value before every run and the sync hub listens for transitions.
/// Clones share the same channel.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    sender: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivitySignal {
    /// Creates a signal with an initial value.
    pub fn new(initial: Connectivity) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Returns the current value.
    pub fn current(&self) -> Connectivity {
        *self.sender.borrow()
    }

    /// Returns true if the remote is reachable.
    pub fn is_available(&self) -> bool {
        self.current() == Connectivity::Available
    }

    /// Publishes a new value. Returns false if it equals the current one, in
    /// which case subscribers are not woken.
    pub fn set(&self, value: Connectivity) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Subscribes to changes.
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(Connectivity::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_changes_only() {
        let signal = ConnectivitySignal::default();
        assert!(!signal.is_available());
        assert!(signal.set(Connectivity::Available));
        assert!(!signal.set(Connectivity::Available));
        assert!(signal.clone().is_available());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let signal = ConnectivitySignal::new(Connectivity::Unavailable);
        let mut rx = signal.subscribe();

        signal.set(Connectivity::Available);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Connectivity::Available);

        signal.set(Connectivity::Available);
        assert!(!rx.has_changed().unwrap());
    }
}
