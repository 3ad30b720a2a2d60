//! RFID ingest pipeline: transport adapter contract, connection registry,
//! hex parser and the orchestrator tying them together.
//!
//! The host owns the socket; this crate owns everything after the bytes
//! arrive. See [`TagHandler`] for the public processing surface and
//! [`adapter::TransportAdapter`] for the contract a host transport
//! implements.
//!
//! # Example
//!
//! ```
//! use taglink_handler::{Handled, HandlerConfig, LoopbackAdapter, StatusUpdate, TagHandler};
//! use taglink_core::RawDatagram;
//!
//! let mut adapter = LoopbackAdapter::new();
//! let handler = TagHandler::with_adapter(HandlerConfig::default(), &mut adapter);
//!
//! handler.borrow().on("dataReady", |event| println!("parsed: {event:?}"));
//!
//! // The transport (here: the loopback) delivers traffic.
//! adapter.push_status(StatusUpdate::new("10.0.0.1", true));
//! adapter.push_data(RawDatagram::new("31323334353637383930", "10.0.0.1"));
//!
//! assert_eq!(handler.borrow().last_processed().unwrap().rfid, "1234567890");
//! ```

pub mod adapter;
pub mod handler;
pub mod parser;
pub mod registry;

pub use adapter::{DataCallback, LoopbackAdapter, StatusCallback, StatusUpdate, TransportAdapter};
pub use handler::{Handled, HandlerConfig, SimulatedRead, TagEvent, TagHandler};
pub use parser::{FormatOptions, TagParser};
pub use registry::{ClientEntry, ConnectionRegistry};

pub use taglink_core::{Error, ParsedTag, RawDatagram, Result};
