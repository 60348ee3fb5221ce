//! Controller-side session setup.
//!
//! # `start()` Sequence
//!
//! ```text
//! idle ─► discovering ─► selecting ─► navigating ─► connecting ─► connected
//!              │              │             │             │
//!              ▼              ▼             ▼             ▼
//!          NotFound         Abort     OperationError OperationError
//!              └──────────────┴──── failed ─┴─────────────┘
//! ```
//!
//! Each step finishes before the next one starts. A failed request can be
//! started again.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, ErrorKind, Result};
use crate::identifiers::PresentationId;
use crate::mechanism::Peer;

use super::connection::Connection;
use super::core::PresentationInner;
use super::selector::DisplayOption;

// ============================================================================
// Constants
// ============================================================================

/// Buffered new-connection notifications per subscriber.
const CONNECTION_BROADCAST_CAPACITY: usize = 16;

// ============================================================================
// RequestState
// ============================================================================

/// Progress of a [`PresentationRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Not started.
    Idle,
    /// Asking mechanisms for displays.
    Discovering,
    /// Waiting for the selector.
    Selecting,
    /// Loading the URL on the chosen display.
    Navigating,
    /// Opening the channel.
    Connecting,
    /// The last `start()` produced a connection.
    Connected,
    /// The last `start()` failed.
    Failed,
}

impl RequestState {
    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Selecting => "selecting",
            Self::Navigating => "navigating",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// PresentationRequest
// ============================================================================

/// Internal shared state for a request.
struct RequestInner {
    presentation: Arc<PresentationInner>,
    url: Url,
    state: watch::Sender<RequestState>,
    connections: broadcast::Sender<Connection>,
}

/// A request to present one URL on a second screen.
///
/// Created by [`Presentation::request`](super::Presentation::request).
#[derive(Clone)]
pub struct PresentationRequest {
    inner: Arc<RequestInner>,
}

impl fmt::Debug for PresentationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationRequest")
            .field("url", &self.inner.url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PresentationRequest - Constructor
// ============================================================================

impl PresentationRequest {
    pub(crate) fn new(presentation: Arc<PresentationInner>, url: Url) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        let (connections, _) = broadcast::channel(CONNECTION_BROADCAST_CAPACITY);

        Self {
            inner: Arc::new(RequestInner {
                presentation,
                url,
                state,
                connections,
            }),
        }
    }
}

// ============================================================================
// PresentationRequest - Accessors
// ============================================================================

impl PresentationRequest {
    /// Returns the presentation URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> RequestState {
        *self.inner.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<RequestState> {
        self.inner.state.subscribe()
    }

    /// Subscribes to new connections.
    ///
    /// Notifications are delivered when the subscriber polls, so the
    /// connection may already be closed by then.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Connection> {
        self.inner.connections.subscribe()
    }
}

// ============================================================================
// PresentationRequest - Public API
// ============================================================================

impl PresentationRequest {
    /// Discovers displays, lets the selector pick one, navigates it to the
    /// URL and connects.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no mechanism reports a display
    /// - [`Error::Abort`] if the selector declines
    /// - [`Error::Operation`] if navigation or channel setup fails
    pub async fn start(&self) -> Result<Connection> {
        match self.run_start().await {
            Ok(connection) => {
                self.set_state(RequestState::Connected);
                self.announce(&connection);
                Ok(connection)
            }
            Err(e) => {
                warn!(url = %self.inner.url, error = %e, "Presentation start failed");
                self.set_state(RequestState::Failed);
                Err(e)
            }
        }
    }

    /// Reconnects to a presentation previously started for this URL.
    ///
    /// Skips discovery and selection. Returns the same [`Connection`] that
    /// was originally started, with a connected channel.
    ///
    /// # Arguments
    ///
    /// * `id` - Connection id as rendered by [`PresentationId`]'s `Display`
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no record matches this URL and `id`
    /// - [`Error::InvalidState`] if that connection was terminated
    /// - [`Error::Operation`] if the channel cannot be re-established
    pub async fn reconnect(&self, id: &str) -> Result<Connection> {
        let not_found =
            || Error::not_found(format!("no presentation {id} for {}", self.inner.url));

        let id: PresentationId = id.parse().map_err(|_| not_found())?;
        let connection = self
            .inner
            .presentation
            .registry
            .find(&self.inner.url, id)
            .ok_or_else(not_found)?;

        debug!(id = %id, url = %self.inner.url, "Reconnecting");
        connection.materialize_channel().await?;
        self.announce(&connection);
        Ok(connection)
    }

    /// Continuous availability monitoring is not implemented.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotSupported`].
    pub async fn get_availability(&self) -> Result<bool> {
        Err(Error::not_supported("getAvailability"))
    }
}

// ============================================================================
// PresentationRequest - Internal
// ============================================================================

impl PresentationRequest {
    async fn run_start(&self) -> Result<Connection> {
        let presentation = &self.inner.presentation;
        let url = &self.inner.url;

        self.set_state(RequestState::Discovering);
        let displays = presentation.discover().await;
        if displays.is_empty() {
            return Err(Error::not_found(format!("no display available for {url}")));
        }

        self.set_state(RequestState::Selecting);
        let options: Vec<DisplayOption> = displays
            .iter()
            .map(|display| DisplayOption {
                name: display.name().to_string(),
                mechanism: display.mechanism().to_string(),
            })
            .collect();
        let index = presentation
            .selector
            .select(url, &options)
            .await
            .ok_or_else(|| Error::abort("display selection was dismissed"))?;
        let chosen = displays.get(index).cloned().ok_or_else(|| {
            Error::abort(format!(
                "selected display {index} is not one of {} offered",
                displays.len()
            ))
        })?;

        self.set_state(RequestState::Navigating);
        info!(
            url = %url,
            mechanism = chosen.mechanism(),
            display_name = chosen.name(),
            "Navigating display"
        );
        chosen.navigate(url).await.map_err(as_operation)?;

        self.set_state(RequestState::Connecting);
        let connection = presentation.registry.register(url, Peer::Display(chosen));
        connection.materialize_channel().await.map_err(as_operation)?;

        info!(id = %connection.id(), url = %url, "Presentation connected");
        Ok(connection)
    }

    fn set_state(&self, next: RequestState) {
        let previous = self.inner.state.send_replace(next);
        if previous != next {
            debug!(url = %self.inner.url, from = %previous, to = %next, "Request state");
        }
    }

    fn announce(&self, connection: &Connection) {
        // No subscribers is fine.
        let _ = self.inner.connections.send(connection.clone());
    }
}

/// Reports transport failures uniformly as operation errors.
fn as_operation(err: Error) -> Error {
    match err.kind() {
        ErrorKind::Operation => err,
        _ => Error::operation(err.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
