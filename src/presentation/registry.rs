//! Presentation records.
//!
//! Each connection a controller starts is recorded as `{url, id,
//! connection}` so that `reconnect` can find it again. Records are only
//! ever appended.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use url::Url;

use crate::identifiers::{IdSequence, PresentationId};
use crate::mechanism::Peer;

use super::connection::Connection;

// ============================================================================
// PresentationRecord
// ============================================================================

/// A started presentation.
#[derive(Debug, Clone)]
pub struct PresentationRecord {
    /// Presentation URL.
    pub url: Url,
    /// Connection id.
    pub id: PresentationId,
    /// The connection itself.
    pub connection: Connection,
}

// ============================================================================
// PresentationRegistry
// ============================================================================

/// Append-only record list with its id sequence.
#[derive(Debug)]
pub(crate) struct PresentationRegistry {
    ids: Arc<IdSequence>,
    records: Mutex<Vec<PresentationRecord>>,
}

impl PresentationRegistry {
    pub(crate) fn new(ids: Arc<IdSequence>) -> Self {
        Self {
            ids,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Creates a connection under a fresh id and records it.
    ///
    /// The id is minted while the record list is locked, so ids appear in
    /// the list in increasing order.
    pub(crate) fn register(&self, url: &Url, peer: Peer) -> Connection {
        let mut records = self.records.lock();
        let id = self.ids.next();
        let connection = Connection::new(id, Some(url.clone()), peer);

        records.push(PresentationRecord {
            url: url.clone(),
            id,
            connection: connection.clone(),
        });
        debug!(id = %id, url = %url, "Presentation registered");

        connection
    }

    /// Finds the connection recorded for `(url, id)`.
    pub(crate) fn find(&self, url: &Url, id: PresentationId) -> Option<Connection> {
        self.records
            .lock()
            .iter()
            .find(|record| record.id == id && &record.url == url)
            .map(|record| record.connection.clone())
    }

    /// Returns all records in registration order.
    pub(crate) fn snapshot(&self) -> Vec<PresentationRecord> {
        self.records.lock().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================
