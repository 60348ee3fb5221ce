//! Receiver-side connection registry.
//!
//! The first call to [`get_connection`](PresentationReceiver::get_connection)
//! or [`get_connections`](PresentationReceiver::get_connections) asks every
//! mechanism to watch for controllers. Each controller that shows up is
//! wrapped in a [`Connection`], its channel is materialized, and only then
//! is it listed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::IdSequence;
use crate::mechanism::{IncomingControllerHandler, Mechanism, Peer, RemoteController};

use super::connection::Connection;

// ============================================================================
// PresentationReceiver
// ============================================================================

/// Internal shared state for the receiver.
struct ReceiverInner {
    mechanisms: Vec<Arc<dyn Mechanism>>,
    ids: Arc<IdSequence>,
    connections: Mutex<Vec<Connection>>,
    first: watch::Sender<Option<Connection>>,
    monitoring: AtomicBool,
    runtime: Mutex<Option<Handle>>,
}

/// Connections from controllers presenting in this context.
///
/// Obtained from [`Presentation::receiver`](super::Presentation::receiver).
#[derive(Clone)]
pub struct PresentationReceiver {
    inner: Arc<ReceiverInner>,
}

impl fmt::Debug for PresentationReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationReceiver")
            .field("connections", &self.inner.connections.lock().len())
            .field("monitoring", &self.inner.monitoring.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PresentationReceiver - Constructor
// ============================================================================

impl PresentationReceiver {
    pub(crate) fn new(mechanisms: Vec<Arc<dyn Mechanism>>, ids: Arc<IdSequence>) -> Self {
        let (first, _) = watch::channel(None);

        Self {
            inner: Arc::new(ReceiverInner {
                mechanisms,
                ids,
                connections: Mutex::new(Vec::new()),
                first,
                monitoring: AtomicBool::new(false),
                runtime: Mutex::new(None),
            }),
        }
    }
}

// ============================================================================
// PresentationReceiver - Public API
// ============================================================================

impl PresentationReceiver {
    /// Waits for the first controller connection.
    ///
    /// Every caller gets the same connection. Waits indefinitely when
    /// this context is not a receiver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the receiver is torn down while
    /// waiting.
    pub async fn get_connection(&self) -> Result<Connection> {
        self.ensure_monitoring();

        let mut rx = self.inner.first.subscribe();
        let first = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::invalid_state("receiver was dropped"))?;

        first
            .clone()
            .ok_or_else(|| Error::invalid_state("receiver has no connection"))
    }

    /// Returns the connections accepted so far, in arrival order.
    #[must_use]
    pub fn get_connections(&self) -> Vec<Connection> {
        self.ensure_monitoring();
        self.inner.connections.lock().clone()
    }
}

// ============================================================================
// PresentationReceiver - Monitoring
// ============================================================================

impl PresentationReceiver {
    fn ensure_monitoring(&self) {
        if self.inner.monitoring.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.inner.runtime.lock() = Handle::try_current().ok();
        debug!(mechanisms = self.inner.mechanisms.len(), "Monitoring for controllers");

        let weak = Arc::downgrade(&self.inner);
        let handler: IncomingControllerHandler = Arc::new(move |controller| {
            if let Some(inner) = weak.upgrade() {
                ReceiverInner::accept(inner, controller);
            }
        });

        for mechanism in &self.inner.mechanisms {
            mechanism.monitor_incoming_controllers(Arc::clone(&handler));
        }
    }
}

impl ReceiverInner {
    /// Wraps an inbound controller and lists it once its channel is up.
    fn accept(this: Arc<Self>, controller: Arc<dyn RemoteController>) {
        let id = this.ids.next();
        let peer_id = controller.peer_id();
        let connection = Connection::new(id, None, Peer::Controller(controller));
        debug!(id = %id, peer = %peer_id, "Controller detected");

        let runtime = this.runtime.lock().clone().or_else(|| Handle::try_current().ok());
        let Some(runtime) = runtime else {
            warn!(id = %id, peer = %peer_id, "No runtime to connect controller on");
            return;
        };

        runtime.spawn(async move {
            match connection.materialize_channel().await {
                Ok(_) => {
                    // The first slot is set under the list lock so it always
                    // matches the head of the list.
                    let mut connections = this.connections.lock();
                    connections.push(connection.clone());
                    this.first.send_if_modified(|first| {
                        if first.is_some() {
                            return false;
                        }
                        *first = Some(connection.clone());
                        true
                    });
                    drop(connections);
                    info!(id = %id, peer = %peer_id, "Controller connected");
                }
                Err(e) => {
                    warn!(id = %id, peer = %peer_id, error = %e, "Controller channel failed");
                }
            }
        });
    }
}
