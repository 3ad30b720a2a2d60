//! Connection-state registry.
//!
//! Authoritative mapping from source address to [`ClientRecord`]. One record
//! exists per distinct source; absence of a record means the source was never
//! seen. Records are created on explicit connect or implicitly on the first
//! datagram from an unseen source, and removed on explicit disconnect or a
//! full reset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taglink_core::{ClientRecord, ClientUpdate, Error, Result, StatsUpdate};
use tracing::debug;

/// Snapshot entry returned by [`ConnectionRegistry::all_clients`], with the
/// source address embedded alongside the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub source: String,
    pub record: ClientRecord,
}

/// Tracks connection state and traffic counters for every known source.
///
/// The connected-counter is maintained independently of the map: it counts
/// `add_client` calls minus successful `remove_client` calls, saturating at
/// zero. On the public API surface the two cannot drift apart; the
/// saturation is a defensive clamp, not a derived value.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: HashMap<String, ClientRecord>,
    connection_count: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, creating or overwriting its record.
    ///
    /// The record defaults to connected-now with zero stats; fields present
    /// in `seed` replace the defaults. Increments the connected-counter and
    /// returns the stored record.
    pub fn add_client(&mut self, source: impl Into<String>, seed: Option<ClientUpdate>) -> &ClientRecord {
        let source = source.into();
        let mut record = ClientRecord::connected_now();
        if let Some(seed) = seed {
            record.apply(seed);
        }
        self.connection_count += 1;
        debug!(%source, "client registered");

        let slot = self
            .clients
            .entry(source)
            .or_insert_with(ClientRecord::connected_now);
        *slot = record;
        slot
    }

    /// Remove a source's record if present.
    ///
    /// Decrements the connected-counter (saturating at zero) and returns
    /// whether a record existed.
    pub fn remove_client(&mut self, source: &str) -> bool {
        if self.clients.remove(source).is_none() {
            return false;
        }
        self.connection_count = self.connection_count.saturating_sub(1);
        debug!(%source, "client removed");
        true
    }

    /// Merge a partial update into an existing record.
    ///
    /// `last_active` is always refreshed; a `stats` field in the update is
    /// deep-merged rather than overwritten.
    ///
    /// # Errors
    /// Returns [`Error::UnknownClient`] if the source was never seen.
    pub fn update_client_status(&mut self, source: &str, update: ClientUpdate) -> Result<&ClientRecord> {
        match self.clients.get_mut(source) {
            Some(record) => {
                record.apply(update);
                Ok(record)
            }
            None => Err(Error::unknown_client(source)),
        }
    }

    /// Bump a source's traffic counters after a datagram was handled.
    ///
    /// An unseen source is implicitly registered first: the first datagram
    /// from a reader counts as its connect. `success` selects which counter
    /// is incremented.
    ///
    /// # Errors
    /// Never fails through this path in practice; the signature mirrors
    /// [`Self::update_client_status`], which it routes through.
    pub fn update_data_stats(&mut self, source: &str, success: bool) -> Result<&ClientRecord> {
        if !self.clients.contains_key(source) {
            self.add_client(source, None);
        }

        let current = self.clients.get(source).map(|r| r.stats).unwrap_or_default();
        let stats = if success {
            StatsUpdate::data_received(current.data_received + 1)
        } else {
            StatsUpdate::errors(current.errors + 1)
        };
        self.update_client_status(source, ClientUpdate::stats(stats))
    }

    /// Look up a single source.
    pub fn client(&self, source: &str) -> Option<&ClientRecord> {
        self.clients.get(source)
    }

    /// Snapshot of every known source and its record.
    pub fn all_clients(&self) -> Vec<ClientEntry> {
        self.clients
            .iter()
            .map(|(source, record)| ClientEntry {
                source: source.clone(),
                record: record.clone(),
            })
            .collect()
    }

    /// Current value of the connected-counter.
    pub fn connection_count(&self) -> usize {
        self.connection_count
    }

    /// Whether at least one source is currently counted as connected.
    pub fn has_active_connections(&self) -> bool {
        self.connection_count > 0
    }

    /// Drop every record and zero the connected-counter.
    ///
    /// Full-state reset, not a per-client disconnect.
    pub fn reset(&mut self) {
        self.clients.clear();
        self.connection_count = 0;
    }
}
