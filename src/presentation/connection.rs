//! Presentation connection.
//!
//! A [`Connection`] gives the application one message and state API
//! whatever transport sits underneath. It wraps a [`Peer`] and owns at
//! most one live [`Channel`] to it, created on demand.
//!
//! # State
//!
//! ```text
//!            materialize_channel()
//!   closed ─────────────────────► connected
//!     ▲                               │
//!     └────────── channel closed ─────┘
//!
//!   any state ── terminate() ──► terminated   (final)
//! ```
//!
//! The state follows the current channel until the connection is
//! terminated; after that, channel events are ignored.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::{Channel, ChannelState, Message, MessageHandler};
use crate::error::{Error, Result};
use crate::identifiers::PresentationId;
use crate::mechanism::Peer;

// ============================================================================
// Types
// ============================================================================

/// Connection state change handler.
pub type ConnectionStateHandler = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// One in-flight channel creation, awaited by every concurrent caller.
type PendingChannel = Shared<BoxFuture<'static, Result<Channel>>>;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No channel is connected.
    Closed,
    /// The channel is connected.
    Connected,
    /// Torn down for good.
    Terminated,
}

impl ConnectionState {
    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connected => "connected",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ChannelState> for ConnectionState {
    fn from(state: ChannelState) -> Self {
        match state {
            ChannelState::Closed => Self::Closed,
            ChannelState::Connected => Self::Connected,
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Internal shared state for a connection.
struct ConnectionInner {
    id: PresentationId,
    url: Option<Url>,
    peer: Peer,
    state: watch::Sender<ConnectionState>,
    channel: Mutex<Option<Channel>>,
    pending: Mutex<Option<PendingChannel>>,
    message_handler: Mutex<Option<MessageHandler>>,
    state_handler: Mutex<Option<ConnectionStateHandler>>,
}

/// A session with one remote peer.
///
/// Cheap to clone; clones refer to the same connection and compare equal.
///
/// # Example
///
/// ```ignore
/// let connection = request.start().await?;
///
/// connection.set_message_handler(|message| println!("{message:?}"));
/// connection.send("next")?;
/// connection.terminate().await;
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("peer", &self.inner.peer)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Connection {}

// ============================================================================
// Connection - Constructor
// ============================================================================

impl Connection {
    /// Creates a closed connection to `peer`.
    ///
    /// `url` is set on the controller side only.
    pub(crate) fn new(id: PresentationId, url: Option<Url>, peer: Peer) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);

        Self {
            inner: Arc::new(ConnectionInner {
                id,
                url,
                peer,
                state,
                channel: Mutex::new(None),
                pending: Mutex::new(None),
                message_handler: Mutex::new(None),
                state_handler: Mutex::new(None),
            }),
        }
    }

    fn from_weak(weak: &Weak<ConnectionInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

// ============================================================================
// Connection - Accessors
// ============================================================================

impl Connection {
    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> PresentationId {
        self.inner.id
    }

    /// Returns the presentation URL (controller side only).
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Returns the remote peer.
    #[inline]
    #[must_use]
    pub fn peer(&self) -> &Peer {
        &self.inner.peer
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Waits until the connection reaches `target`.
    pub async fn wait_for_state(&self, target: ConnectionState) {
        let mut rx = self.watch_state();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state == target).await;
    }
}

// ============================================================================
// Connection - Handlers
// ============================================================================

impl Connection {
    /// Sets the inbound message handler, replacing any previous one.
    ///
    /// Carries over to channels created later by reconnecting.
    pub fn set_message_handler(&self, handler: impl Fn(Message) + Send + Sync + 'static) {
        let handler: MessageHandler = Arc::new(handler);
        *self.inner.message_handler.lock() = Some(Arc::clone(&handler));

        let channel = self.inner.channel.lock().clone();
        if let Some(channel) = channel {
            channel.set_message_handler(move |message| handler(message));
        }
    }

    /// Clears the inbound message handler.
    pub fn clear_message_handler(&self) {
        *self.inner.message_handler.lock() = None;

        let channel = self.inner.channel.lock().clone();
        if let Some(channel) = channel {
            channel.clear_message_handler();
        }
    }

    /// Sets the state change handler, replacing any previous one.
    pub fn set_state_handler(&self, handler: impl Fn(ConnectionState) + Send + Sync + 'static) {
        *self.inner.state_handler.lock() = Some(Arc::new(handler));
    }

    /// Clears the state change handler.
    pub fn clear_state_handler(&self) {
        *self.inner.state_handler.lock() = None;
    }
}

// ============================================================================
// Connection - Application API
// ============================================================================

impl Connection {
    /// Sends a message to the peer.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the connection is connected
    /// - [`Error::Operation`] if the transport refuses the message
    pub fn send(&self, message: impl Into<Message>) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(Error::invalid_state(format!(
                "connection {} is {state}",
                self.inner.id
            )));
        }

        let channel = self.inner.channel.lock().clone().ok_or_else(|| {
            Error::invalid_state(format!("connection {} has no channel", self.inner.id))
        })?;
        channel.send(message)
    }

    /// Closes the current channel.
    ///
    /// The connection moves to closed and can be brought back with
    /// `reconnect`. No-op if no channel is connected.
    pub fn close(&self) {
        let channel = self.inner.channel.lock().clone();
        if let Some(channel) = channel {
            channel.close();
        }
    }

    /// Terminates the connection.
    ///
    /// Closes the channel, asks the peer to tear its transport down and
    /// moves to terminated. Calling it again does nothing.
    pub async fn terminate(&self) {
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Terminated {
                return false;
            }
            *state = ConnectionState::Terminated;
            true
        });
        if !changed {
            return;
        }

        info!(
            id = %self.inner.id,
            mechanism = self.inner.peer.mechanism(),
            "Terminating connection"
        );
        self.notify_state(ConnectionState::Terminated);

        let channel = self.inner.channel.lock().take();
        if let Some(channel) = channel {
            channel.clear_state_handler();
            channel.close();
        }

        if let Err(e) = self.inner.peer.terminate().await {
            warn!(id = %self.inner.id, error = %e, "Peer teardown failed");
        }
    }
}

// ============================================================================
// Connection - Channel Materialization
// ============================================================================

impl Connection {
    /// Returns a connected channel, creating one if needed.
    ///
    /// A connected channel is returned as-is. Otherwise one creation is
    /// started and every concurrent caller awaits that same attempt.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the connection is terminated
    /// - whatever the peer's `create_channel` reports
    pub async fn materialize_channel(&self) -> Result<Channel> {
        if self.state() == ConnectionState::Terminated {
            return Err(Error::invalid_state(format!(
                "connection {} is terminated",
                self.inner.id
            )));
        }

        let current = self.inner.channel.lock().clone();
        if let Some(channel) = current.filter(Channel::is_connected) {
            return Ok(channel);
        }

        let pending = {
            let mut pending = self.inner.pending.lock();
            match pending.as_ref() {
                Some(shared) => shared.clone(),
                None => {
                    debug!(id = %self.inner.id, "Creating channel");
                    let shared = self.create_channel_future();
                    *pending = Some(shared.clone());
                    shared
                }
            }
        };

        pending.await
    }

    fn create_channel_future(&self) -> PendingChannel {
        let weak = Arc::downgrade(&self.inner);
        let peer = self.inner.peer.clone();

        async move {
            let created = peer.create_channel().await;

            let Some(connection) = Connection::from_weak(&weak) else {
                return created;
            };
            *connection.inner.pending.lock() = None;

            let channel = created?;
            if connection.state() == ConnectionState::Terminated {
                channel.close();
                return Err(Error::invalid_state(format!(
                    "connection {} was terminated while connecting",
                    connection.inner.id
                )));
            }

            connection.attach(&channel);
            Ok(channel)
        }
        .boxed()
        .shared()
    }

    /// Makes `channel` the current one and mirrors its state.
    fn attach(&self, channel: &Channel) {
        let previous = self.inner.channel.lock().replace(channel.clone());
        if let Some(previous) = previous {
            previous.clear_state_handler();
            previous.clear_message_handler();
        }

        let weak = Arc::downgrade(&self.inner);
        channel.set_state_handler(move |state| {
            if let Some(connection) = Connection::from_weak(&weak) {
                connection.sync_state(state.into());
            }
        });

        let handler = self.inner.message_handler.lock().clone();
        if let Some(handler) = handler {
            channel.set_message_handler(move |message| handler(message));
        }

        info!(id = %self.inner.id, channel = %channel.id(), "Connection channel attached");
        self.sync_state(channel.state().into());
    }
}

// ============================================================================
// Connection - Internal
// ============================================================================

impl Connection {
    /// Follows a channel state change unless terminated.
    fn sync_state(&self, next: ConnectionState) {
        let changed = self.inner.state.send_if_modified(|state| {
            if *state == ConnectionState::Terminated || *state == next {
                return false;
            }
            *state = next;
            true
        });

        if changed {
            debug!(id = %self.inner.id, state = %next, "Connection state changed");
            self.notify_state(next);
        }
    }

    fn notify_state(&self, state: ConnectionState) {
        let handler = self.inner.state_handler.lock().clone();
        if let Some(handler) = handler {
            handler(state);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
