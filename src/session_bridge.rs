//! Bridge between background session tasks and the host's main loop.
//!
//! The session core is mutated from exactly one place: handler calls driven by
//! the host. Background work (the post-start bootstrap) runs in Tokio tasks
//! and reports results through this channel instead of touching session state
//! directly. The host drains the bridge each tick via
//! [`crate::session::EmulatorSession::process_events`], so no locking is
//! needed around the registry or the emulator state.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

/// Results delivered from background tasks to the session.
///
/// Every event carries the bootstrap generation it belongs to. The session
/// bumps the generation on stop/restart, so an event from a superseded
/// bootstrap is recognizable and dropped instead of mutating a session it no
/// longer belongs to.
#[derive(Debug)]
pub enum SessionEvent {
    /// Default accounts were provisioned after emulator start
    BootstrapReady {
        generation: u64,
        addresses: Vec<String>,
    },

    /// Default account provisioning failed
    BootstrapFailed { generation: u64, error: String },
}

/// Cloneable channel pair: the sender side goes into spawned tasks, the
/// receiver side is drained non-blocking from the main loop.
#[derive(Clone)]
pub struct SessionBridge {
    sender: mpsc::Sender<SessionEvent>,
    receiver: Arc<Mutex<mpsc::Receiver<SessionEvent>>>,
}

impl SessionBridge {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Get a cloneable sender for background tasks
    pub fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.sender.clone()
    }

    /// Drain all pending events without blocking
    pub fn try_recv_all(&self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Ok(receiver) = self.receiver.lock() {
            while let Ok(event) = receiver.try_recv() {
                events.push(event);
            }
        }
        events
    }
}

impl Default for SessionBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_send_order() {
        let bridge = SessionBridge::new();
        let sender = bridge.sender();

        sender
            .send(SessionEvent::BootstrapReady {
                generation: 1,
                addresses: vec!["01".to_string()],
            })
            .unwrap();
        sender
            .send(SessionEvent::BootstrapFailed {
                generation: 1,
                error: "boom".to_string(),
            })
            .unwrap();

        let events = bridge.try_recv_all();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::BootstrapReady { .. }));
        assert!(matches!(events[1], SessionEvent::BootstrapFailed { .. }));
    }

    #[test]
    fn drain_is_non_blocking_and_exhaustive() {
        let bridge = SessionBridge::new();
        assert!(bridge.try_recv_all().is_empty());

        bridge
            .sender()
            .send(SessionEvent::BootstrapFailed {
                generation: 0,
                error: "boom".to_string(),
            })
            .unwrap();

        assert_eq!(bridge.try_recv_all().len(), 1);
        assert!(bridge.try_recv_all().is_empty());
    }

    #[test]
    fn cloned_senders_feed_the_same_receiver() {
        let bridge = SessionBridge::new();
        let a = bridge.sender();
        let b = a.clone();

        a.send(SessionEvent::BootstrapReady {
            generation: 1,
            addresses: vec![],
        })
        .unwrap();
        b.send(SessionEvent::BootstrapReady {
            generation: 2,
            addresses: vec![],
        })
        .unwrap();

        assert_eq!(bridge.try_recv_all().len(), 2);
    }
}
