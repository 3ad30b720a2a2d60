//! Pipeline orchestrator.
//!
//! [`TagHandler`] wires the parser and the connection registry together on
//! top of the event bus and exposes the public processing surface. It holds
//! a [`EventBus`] and delegates subscription to it rather than being one
//! itself, which keeps the dispatcher independently testable.
//!
//! # Control flow
//!
//! ```text
//! TransportAdapter ──► handle_data ──► registry stats
//!                         │              │
//!                         ▼              ▼
//!                      rawData ───► process_data ──► dataReady / parseError
//!
//! TransportAdapter ──► handle_status ──► registry add/remove ──► connectionStatus
//! ```
//!
//! Every operation runs to completion on the calling thread. Event handlers
//! receive `&TagEvent` and must not re-enter mutating handler methods; a
//! host that multiplexes several transport threads onto one handler must
//! serialize access externally.

use crate::adapter::{StatusUpdate, TransportAdapter};
use crate::parser::TagParser;
use crate::registry::{ClientEntry, ConnectionRegistry};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use taglink_core::constants::{DEFAULT_RFID_LENGTH, DEFAULT_SIMULATED_SOURCE};
use taglink_core::{ParsedTag, RawDatagram};
use taglink_events::{EventBus, HandlerId};
use tracing::debug;

/// Outcome event published by the orchestrator.
///
/// Each variant dispatches under the event name returned by
/// [`TagEvent::name`], so hosts subscribe by name and match on the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TagEvent {
    /// The handler finished wiring (or declined) its adapter.
    Initialized {
        has_adapter: bool,
        auto_process: bool,
    },

    /// A structurally valid datagram arrived, untouched.
    RawData(RawDatagram),

    /// A datagram parsed into a validated identifier.
    DataReady(ParsedTag),

    /// A datagram failed identifier extraction.
    ParseError { message: String, raw: RawDatagram },

    /// A source connected or disconnected.
    ConnectionStatus {
        source: String,
        connected: bool,
        client_count: usize,
    },

    /// Malformed input or an unexpected processing fault, carrying the
    /// offending input so the host can attribute and inspect it.
    Error {
        message: String,
        raw: Option<RawDatagram>,
        status: Option<StatusUpdate>,
    },

    /// A simulated datagram is about to enter the normal data path.
    SimulatedData(RawDatagram),

    /// Registry and cache were cleared.
    Reset,
}

impl TagEvent {
    /// Event name this variant dispatches under.
    pub fn name(&self) -> &'static str {
        match self {
            TagEvent::Initialized { .. } => "initialized",
            TagEvent::RawData(_) => "rawData",
            TagEvent::DataReady(_) => "dataReady",
            TagEvent::ParseError { .. } => "parseError",
            TagEvent::ConnectionStatus { .. } => "connectionStatus",
            TagEvent::Error { .. } => "error",
            TagEvent::SimulatedData(_) => "simulatedData",
            TagEvent::Reset => "reset",
        }
    }
}

/// Result of [`TagHandler::handle_data`].
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// Auto-processing was on and the datagram parsed successfully.
    Parsed(ParsedTag),

    /// Auto-processing was off; the datagram is returned unchanged.
    Raw(RawDatagram),
}

/// Construction options for [`TagHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Parse datagrams as they arrive. When off, the host drives
    /// [`TagHandler::manual_process`] itself.
    pub auto_process: bool,

    /// Expected identifier length in decimal digits.
    pub rfid_length: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            auto_process: true,
            rfid_length: DEFAULT_RFID_LENGTH,
        }
    }
}

/// Input accepted by [`TagHandler::simulate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedRead {
    /// A bare hex payload; wrapped into a synthetic datagram with the
    /// current time and the supplied or default source.
    Payload(String),

    /// A prepared datagram; an empty source is defaulted.
    Datagram(RawDatagram),
}

impl From<&str> for SimulatedRead {
    fn from(payload: &str) -> Self {
        SimulatedRead::Payload(payload.to_string())
    }
}

impl From<String> for SimulatedRead {
    fn from(payload: String) -> Self {
        SimulatedRead::Payload(payload)
    }
}

impl From<RawDatagram> for SimulatedRead {
    fn from(datagram: RawDatagram) -> Self {
        SimulatedRead::Datagram(datagram)
    }
}

/// Orchestrates parser, registry and event bus behind one public surface.
pub struct TagHandler {
    config: HandlerConfig,
    events: EventBus<TagEvent>,
    parser: TagParser,
    registry: ConnectionRegistry,
    last_processed: Option<ParsedTag>,
}

impl TagHandler {
    /// Create an adapterless handler (simulation-only usage works fine).
    pub fn new(config: HandlerConfig) -> Self {
        let parser = TagParser::new(config.rfid_length);
        Self::with_parser(config, parser)
    }

    /// Create a handler whose parser uses a custom date-prefix formatter.
    pub fn new_with_formatter(
        config: HandlerConfig,
        formatter: impl Fn(DateTime<Local>) -> String + 'static,
    ) -> Self {
        let parser = TagParser::with_formatter(config.rfid_length, formatter);
        Self::with_parser(config, parser)
    }

    fn with_parser(config: HandlerConfig, parser: TagParser) -> Self {
        Self {
            config,
            events: EventBus::new(),
            parser,
            registry: ConnectionRegistry::new(),
            last_processed: None,
        }
    }

    /// Create a handler and immediately wire it to a transport adapter.
    ///
    /// Returns the shared handle the adapter callbacks also hold.
    pub fn with_adapter(
        config: HandlerConfig,
        adapter: &mut impl TransportAdapter,
    ) -> Rc<RefCell<Self>> {
        let handler = Rc::new(RefCell::new(Self::new(config)));
        Self::bind_adapter(&handler, adapter);
        handler
    }

    /// Wire an adapter's registration points to this handler.
    ///
    /// Datagrams go to [`Self::handle_data`], status changes to
    /// [`Self::handle_status`]; emits `initialized` once wiring is done.
    /// The handler must be shared (`Rc<RefCell<_>>`) because the adapter
    /// callbacks keep their own handles to it.
    pub fn bind_adapter(this: &Rc<RefCell<Self>>, adapter: &mut impl TransportAdapter) {
        let data_handle = Rc::clone(this);
        adapter.register_data_callback(Box::new(move |datagram| {
            let _ = data_handle.borrow_mut().handle_data(datagram);
        }));

        let status_handle = Rc::clone(this);
        adapter.register_status_callback(Box::new(move |status| {
            status_handle.borrow_mut().handle_status(status);
        }));

        let handler = this.borrow();
        handler.emit(TagEvent::Initialized {
            has_adapter: true,
            auto_process: handler.config.auto_process,
        });
    }

    /// Announce readiness without an adapter.
    ///
    /// Emits `initialized` with `has_adapter: false`; useful for hosts that
    /// drive the handler through [`Self::simulate`] or direct calls only.
    pub fn init(&self) {
        self.emit(TagEvent::Initialized {
            has_adapter: false,
            auto_process: self.config.auto_process,
        });
    }

    /// Ingest one datagram from the transport.
    ///
    /// An empty payload or source emits `error` (with the rejected datagram
    /// attached) and yields `None`; stats are left untouched on that path,
    /// since the datagram may carry no source to attribute them to.
    /// Otherwise the source's received-counter is bumped, `rawData` is
    /// emitted with the untouched datagram, and — with auto-processing on —
    /// the datagram is parsed ([`Handled::Parsed`] on success, `None` on
    /// parse failure). With auto-processing off the datagram is returned
    /// unchanged as [`Handled::Raw`].
    pub fn handle_data(&mut self, raw: RawDatagram) -> Option<Handled> {
        if raw.hex_payload.is_empty() || raw.source.is_empty() {
            self.emit(TagEvent::Error {
                message: "datagram missing payload or source".to_string(),
                raw: Some(raw),
                status: None,
            });
            return None;
        }

        if let Err(error) = self.registry.update_data_stats(&raw.source, true) {
            debug!(%error, "stats update failed");
        }
        self.emit(TagEvent::RawData(raw.clone()));

        if self.config.auto_process {
            self.process_data(&raw).map(Handled::Parsed)
        } else {
            Some(Handled::Raw(raw))
        }
    }

    /// Apply a connect/disconnect notification from the transport.
    ///
    /// Adds or removes the registry record and emits `connectionStatus`
    /// with the current connected-count. An empty source emits `error` with
    /// the rejected update attached.
    pub fn handle_status(&mut self, status: StatusUpdate) {
        if status.source.is_empty() {
            self.emit(TagEvent::Error {
                message: "status update missing source".to_string(),
                raw: None,
                status: Some(status),
            });
            return;
        }

        if status.connected {
            self.registry.add_client(status.source.clone(), None);
        } else {
            self.registry.remove_client(&status.source);
        }

        self.emit(TagEvent::ConnectionStatus {
            source: status.source,
            connected: status.connected,
            client_count: self.registry.connection_count(),
        });
    }

    /// Parse a datagram and publish the outcome.
    ///
    /// On success the result is cached as last-processed and `dataReady` is
    /// emitted; on failure the source's error counter is bumped and
    /// `parseError` is emitted. Never propagates a failure to the caller.
    pub fn process_data(&mut self, raw: &RawDatagram) -> Option<ParsedTag> {
        match self.parser.parse(raw) {
            Some(tag) => {
                self.last_processed = Some(tag.clone());
                self.emit(TagEvent::DataReady(tag.clone()));
                Some(tag)
            }
            None => {
                if !raw.source.is_empty()
                    && let Err(error) = self.registry.update_data_stats(&raw.source, false)
                {
                    debug!(%error, "stats update failed");
                }
                self.emit(TagEvent::ParseError {
                    message: "identifier extraction failed".to_string(),
                    raw: raw.clone(),
                });
                None
            }
        }
    }

    /// Explicit processing entry point for `auto_process = false` hosts.
    ///
    /// Identical semantics to the auto path's processing step.
    pub fn manual_process(&mut self, raw: &RawDatagram) -> Option<ParsedTag> {
        self.process_data(raw)
    }

    /// Feed a simulated read through the normal data path.
    ///
    /// Accepts a bare hex payload or a prepared datagram (see
    /// [`SimulatedRead`]); `source` overrides the default simulated address.
    /// Emits `simulatedData` before delegating to [`Self::handle_data`].
    pub fn simulate(
        &mut self,
        mock: impl Into<SimulatedRead>,
        source: Option<&str>,
    ) -> Option<Handled> {
        let fallback = source.unwrap_or(DEFAULT_SIMULATED_SOURCE);
        let datagram = match mock.into() {
            SimulatedRead::Payload(hex) => RawDatagram::new(hex, fallback),
            SimulatedRead::Datagram(mut datagram) => {
                if datagram.source.is_empty() {
                    datagram.source = fallback.to_string();
                }
                datagram
            }
        };

        self.emit(TagEvent::SimulatedData(datagram.clone()));
        self.handle_data(datagram)
    }

    /// Clear all registry state and the last-processed cache, then emit
    /// `reset`.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.last_processed = None;
        self.emit(TagEvent::Reset);
    }

    /// Subscribe to an event by name (see [`TagEvent::name`]).
    pub fn on(&self, event: impl Into<String>, handler: impl FnMut(&TagEvent) + 'static) -> HandlerId {
        self.events.on(event, handler)
    }

    /// Unsubscribe one registration, or every handler for the event.
    pub fn off(&self, event: &str, id: Option<HandlerId>) -> bool {
        self.events.off(event, id)
    }

    /// The underlying event bus, for `once`/`remove_all` and introspection.
    pub fn events(&self) -> &EventBus<TagEvent> {
        &self.events
    }

    /// The connection registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Mutable access to the connection registry.
    pub fn registry_mut(&mut self) -> &mut ConnectionRegistry {
        &mut self.registry
    }

    /// Snapshot of every known client.
    pub fn clients(&self) -> Vec<ClientEntry> {
        self.registry.all_clients()
    }

    /// The single most recently parsed identifier, if any.
    pub fn last_processed(&self) -> Option<&ParsedTag> {
        self.last_processed.as_ref()
    }

    /// The configuration this handler was constructed with.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    fn emit(&self, event: TagEvent) {
        self.events.emit(event.name(), &event);
    }
}

impl Default for TagHandler {
    fn default() -> Self {
        Self::new(HandlerConfig::default())
    }
}
