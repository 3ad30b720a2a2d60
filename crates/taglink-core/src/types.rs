use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One discrete raw hex payload attributed to a source address.
///
/// Datagrams are transient: the pipeline consumes them synchronously and
/// never stores them beyond the current call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDatagram {
    /// Hex-encoded payload exactly as delivered by the reader hardware.
    pub hex_payload: String,

    /// Transport-level identifier of the originating reader (e.g. an IP).
    pub source: String,

    /// When the datagram was received.
    pub timestamp: DateTime<Local>,
}

impl RawDatagram {
    /// Create a datagram timestamped with the current local time.
    pub fn new(hex_payload: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            hex_payload: hex_payload.into(),
            source: source.into(),
            timestamp: Local::now(),
        }
    }

    /// Replace the receive timestamp (used when replaying captured traffic).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A validated, date-qualified identifier produced by a successful parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTag {
    /// The fixed-length decimal identifier extracted from the payload.
    pub rfid: String,

    /// `"{date_prefix}-{rfid}"` as produced by the configured formatter.
    pub formatted: String,

    /// Source address the datagram arrived from.
    pub source: String,

    /// Timestamp of the originating datagram.
    pub timestamp: DateTime<Local>,

    /// The untouched hex payload the identifier was extracted from.
    pub raw_hex: String,
}

impl fmt::Display for ParsedTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.formatted, self.source)
    }
}

/// Connection state of a known source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClientStatus::Connected => write!(f, "connected"),
            ClientStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Per-source traffic counters.
///
/// Counters only grow until the registry is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStats {
    /// Datagrams accepted from this source.
    pub data_received: u64,

    /// Malformed datagrams or failed parses attributed to this source.
    pub errors: u64,
}

impl ClientStats {
    /// Merge an update field-wise: each counter present in the update
    /// replaces the stored value, absent counters are left untouched.
    pub fn apply(&mut self, update: StatsUpdate) {
        if let Some(data_received) = update.data_received {
            self.data_received = data_received;
        }
        if let Some(errors) = update.errors {
            self.errors = errors;
        }
    }
}

/// Partial stats update. Present fields replace the stored counter,
/// absent fields are preserved (merge, not overwrite).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsUpdate {
    pub data_received: Option<u64>,
    pub errors: Option<u64>,
}

impl StatsUpdate {
    /// Update only the received-data counter.
    pub fn data_received(value: u64) -> Self {
        Self {
            data_received: Some(value),
            errors: None,
        }
    }

    /// Update only the error counter.
    pub fn errors(value: u64) -> Self {
        Self {
            data_received: None,
            errors: Some(value),
        }
    }
}

/// State record for one known source address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Current connection status.
    pub status: ClientStatus,

    /// When the source was first registered (or last re-registered).
    pub connected_at: DateTime<Local>,

    /// Refreshed on every registry mutation touching this record.
    pub last_active: DateTime<Local>,

    /// Traffic counters for this source.
    pub stats: ClientStats,
}

impl ClientRecord {
    /// A freshly connected record: both timestamps set to now, zero stats.
    pub fn connected_now() -> Self {
        let now = Local::now();
        Self {
            status: ClientStatus::Connected,
            connected_at: now,
            last_active: now,
            stats: ClientStats::default(),
        }
    }

    /// Shallow-merge an update into this record. `status` replaces, `stats`
    /// deep-merges, and `last_active` is always refreshed.
    pub fn apply(&mut self, update: ClientUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(stats) = update.stats {
            self.stats.apply(stats);
        }
        self.last_active = Local::now();
    }
}

impl Default for ClientRecord {
    fn default() -> Self {
        Self::connected_now()
    }
}

/// Partial update for a [`ClientRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUpdate {
    /// New connection status, if it changed.
    pub status: Option<ClientStatus>,

    /// Stats counters to merge in.
    pub stats: Option<StatsUpdate>,
}

impl ClientUpdate {
    /// An update carrying only a status change.
    pub fn status(status: ClientStatus) -> Self {
        Self {
            status: Some(status),
            stats: None,
        }
    }

    /// An update carrying only a stats merge.
    pub fn stats(stats: StatsUpdate) -> Self {
        Self {
            status: None,
            stats: Some(stats),
        }
    }
}
