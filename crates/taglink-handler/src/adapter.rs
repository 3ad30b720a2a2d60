//! Transport adapter contract.
//!
//! The core never opens a socket. The host supplies an adapter bridging its
//! transport (TCP listener, serial bridge, IPC channel) into the pipeline by
//! implementing [`TransportAdapter`]: the orchestrator hands the adapter its
//! processing callbacks, and the adapter invokes them as bytes and status
//! changes arrive.
//!
//! Both registration points have default no-op implementations, so an
//! adapter may support only one of the two capabilities, and the
//! orchestrator works with no adapter at all (simulation-only usage).

use serde::{Deserialize, Serialize};
use taglink_core::RawDatagram;

/// Connect/disconnect notification from the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Transport-level identifier of the affected reader.
    pub source: String,

    /// `true` on connect, `false` on disconnect.
    pub connected: bool,
}

impl StatusUpdate {
    /// Create a status update.
    pub fn new(source: impl Into<String>, connected: bool) -> Self {
        Self {
            source: source.into(),
            connected,
        }
    }
}

/// Callback invoked for each datagram the transport delivers.
pub type DataCallback = Box<dyn FnMut(RawDatagram)>;

/// Callback invoked for each connection status change.
pub type StatusCallback = Box<dyn FnMut(StatusUpdate)>;

/// Host-supplied bridge between an external transport and the pipeline.
///
/// The orchestrator calls the registration methods once during binding; the
/// adapter then invokes the stored callbacks synchronously, one event at a
/// time, in delivery order. The core performs no buffering or reordering of
/// its own.
pub trait TransportAdapter {
    /// Store the callback to invoke for incoming datagrams.
    fn register_data_callback(&mut self, callback: DataCallback) {
        let _ = callback;
    }

    /// Store the callback to invoke for connection status changes.
    fn register_status_callback(&mut self, callback: StatusCallback) {
        let _ = callback;
    }
}

/// In-memory adapter for tests and offline development.
///
/// Stores the registered callbacks and lets the caller push traffic through
/// them directly, standing in for a real transport.
#[derive(Default)]
pub struct LoopbackAdapter {
    data_callback: Option<DataCallback>,
    status_callback: Option<StatusCallback>,
}

impl LoopbackAdapter {
    /// Create an adapter with no callbacks registered yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a datagram to the registered data callback.
    ///
    /// Returns whether a callback was registered to receive it.
    pub fn push_data(&mut self, datagram: RawDatagram) -> bool {
        match self.data_callback.as_mut() {
            Some(callback) => {
                callback(datagram);
                true
            }
            None => false,
        }
    }

    /// Deliver a status change to the registered status callback.
    ///
    /// Returns whether a callback was registered to receive it.
    pub fn push_status(&mut self, status: StatusUpdate) -> bool {
        match self.status_callback.as_mut() {
            Some(callback) => {
                callback(status);
                true
            }
            None => false,
        }
    }

    /// Whether a data callback has been registered.
    pub fn has_data_callback(&self) -> bool {
        self.data_callback.is_some()
    }

    /// Whether a status callback has been registered.
    pub fn has_status_callback(&self) -> bool {
        self.status_callback.is_some()
    }
}

impl TransportAdapter for LoopbackAdapter {
    fn register_data_callback(&mut self, callback: DataCallback) {
        self.data_callback = Some(callback);
    }

    fn register_status_callback(&mut self, callback: StatusCallback) {
        self.status_callback = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_loopback_stores_and_invokes_callbacks() {
        let mut adapter = LoopbackAdapter::new();
        assert!(!adapter.has_data_callback());
        assert!(!adapter.push_data(RawDatagram::new("31", "10.0.0.1")));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        adapter.register_data_callback(Box::new(move |datagram| {
            sink.borrow_mut().push(datagram.source);
        }));

        assert!(adapter.has_data_callback());
        assert!(adapter.push_data(RawDatagram::new("31", "10.0.0.1")));
        assert_eq!(*seen.borrow(), vec!["10.0.0.1".to_string()]);
    }

    #[test]
    fn test_loopback_status_callback() {
        let mut adapter = LoopbackAdapter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        adapter.register_status_callback(Box::new(move |status| {
            sink.borrow_mut().push((status.source, status.connected));
        }));

        adapter.push_status(StatusUpdate::new("10.0.0.1", true));
        adapter.push_status(StatusUpdate::new("10.0.0.1", false));
        assert_eq!(
            *seen.borrow(),
            vec![
                ("10.0.0.1".to_string(), true),
                ("10.0.0.1".to_string(), false)
            ]
        );
    }

    #[test]
    fn test_default_registrations_are_noops() {
        struct DataOnlyAdapter {
            registered: bool,
        }
        impl TransportAdapter for DataOnlyAdapter {
            fn register_data_callback(&mut self, _callback: DataCallback) {
                self.registered = true;
            }
        }

        let mut adapter = DataOnlyAdapter { registered: false };
        adapter.register_data_callback(Box::new(|_| {}));
        // default status registration accepts and drops the callback
        adapter.register_status_callback(Box::new(|_| {}));
        assert!(adapter.registered);
    }
}
