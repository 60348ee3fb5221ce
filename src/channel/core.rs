//! Channel state machine and handler slots.
//!
//! A [`Channel`] is created connected by a transport once its setup
//! handshake completes. It only ever moves to closed; re-establishing
//! a transport produces a brand new channel.
//!
//! # Handler Dispatch
//!
//! Handlers are cloned out of their slot before being called, so a handler
//! may replace itself or close the channel without deadlocking. Messages
//! that arrive while no message handler is installed are held back and
//! replayed, in order, to the next handler set.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::ChannelId;

use super::Message;

// ============================================================================
// Types
// ============================================================================

/// Inbound message handler.
///
/// Called synchronously for every message the transport delivers.
pub type MessageHandler = Arc<dyn Fn(Message) + Send + Sync>;

/// State change handler.
///
/// Called once per actual transition.
pub type StateHandler = Arc<dyn Fn(ChannelState) + Send + Sync>;

// ============================================================================
// ChannelState
// ============================================================================

/// Lifecycle state of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// No messages can be sent.
    Closed,
    /// Messages flow in both directions.
    Connected,
}

impl ChannelState {
    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ChannelSink
// ============================================================================

/// Transport side of a channel.
///
/// Implemented once per mechanism. `deliver` must not block; delivery is
/// fire-and-forget.
pub trait ChannelSink: Send + Sync {
    /// Hands an outbound message to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`] if the transport refuses the message.
    fn deliver(&self, message: Message) -> Result<()>;

    /// Releases transport resources after a local close.
    fn close(&self) {}
}

// ============================================================================
// Channel
// ============================================================================

/// Internal shared state for a channel.
struct ChannelInner {
    id: ChannelId,
    state: Mutex<ChannelState>,
    sink: Box<dyn ChannelSink>,
    message_handler: Mutex<Option<MessageHandler>>,
    state_handler: Mutex<Option<StateHandler>>,
    backlog: Mutex<VecDeque<Message>>,
}

/// A bidirectional message pipe to one remote peer.
///
/// Clones share the same underlying channel; equality is identity.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

/// Non-owning reference to a [`Channel`].
///
/// Transports hold this in their routing tables so that a dropped
/// connection does not keep its channel alive.
#[derive(Clone)]
pub struct WeakChannel {
    inner: Weak<ChannelInner>,
}

impl WeakChannel {
    /// Upgrades to a strong handle if the channel is still alive.
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<Channel> {
        self.inner.upgrade().map(|inner| Channel { inner })
    }
}

// ============================================================================
// Channel - Display
// ============================================================================

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Channel {}

// ============================================================================
// Channel - Constructor
// ============================================================================

impl Channel {
    /// Creates a connected channel over the given transport sink.
    pub fn new(sink: impl ChannelSink + 'static) -> Self {
        let id = ChannelId::next();
        debug!(channel = %id, "Channel connected");

        Self {
            inner: Arc::new(ChannelInner {
                id,
                state: Mutex::new(ChannelState::Connected),
                sink: Box::new(sink),
                message_handler: Mutex::new(None),
                state_handler: Mutex::new(None),
                backlog: Mutex::new(VecDeque::new()),
            }),
        }
    }
}

// ============================================================================
// Channel - Accessors
// ============================================================================

impl Channel {
    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.inner.state.lock()
    }

    /// Returns `true` while the channel is connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Returns a non-owning handle.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakChannel {
        WeakChannel {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

// ============================================================================
// Channel - Handlers
// ============================================================================

impl Channel {
    /// Sets the inbound message handler, replacing any previous one.
    ///
    /// Messages held back while no handler was installed are delivered to
    /// the new handler before this returns.
    pub fn set_message_handler(&self, handler: impl Fn(Message) + Send + Sync + 'static) {
        let handler: MessageHandler = Arc::new(handler);
        *self.inner.message_handler.lock() = Some(Arc::clone(&handler));

        let held: Vec<Message> = self.inner.backlog.lock().drain(..).collect();
        if !held.is_empty() {
            trace!(channel = %self.inner.id, count = held.len(), "Replaying held messages");
        }
        for message in held {
            handler(message);
        }
    }

    /// Clears the inbound message handler.
    pub fn clear_message_handler(&self) {
        *self.inner.message_handler.lock() = None;
    }

    /// Sets the state change handler, replacing any previous one.
    pub fn set_state_handler(&self, handler: impl Fn(ChannelState) + Send + Sync + 'static) {
        *self.inner.state_handler.lock() = Some(Arc::new(handler));
    }

    /// Clears the state change handler.
    pub fn clear_state_handler(&self) {
        *self.inner.state_handler.lock() = None;
    }
}

// ============================================================================
// Channel - Application API
// ============================================================================

impl Channel {
    /// Sends a message to the peer.
    ///
    /// Returns as soon as the transport has accepted the message.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the channel is closed
    /// - [`Error::Operation`] if the transport refuses the message
    pub fn send(&self, message: impl Into<Message>) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::invalid_state(format!(
                "channel {} is closed",
                self.inner.id
            )));
        }

        let message = message.into();
        trace!(channel = %self.inner.id, len = message.len(), "Channel send");
        self.inner.sink.deliver(message)
    }

    /// Closes the channel.
    ///
    /// No-op if already closed. Otherwise releases the transport sink and
    /// fires the state handler once.
    pub fn close(&self) {
        if self.transition_to_closed() {
            self.inner.sink.close();
            debug!(channel = %self.inner.id, "Channel closed locally");
            self.notify_state(ChannelState::Closed);
        }
    }
}

// ============================================================================
// Channel - Transport API
// ============================================================================

impl Channel {
    /// Delivers an inbound message to the message handler.
    ///
    /// Messages arriving after the channel closed are dropped.
    pub fn dispatch_message(&self, message: Message) {
        if !self.is_connected() {
            trace!(channel = %self.inner.id, "Dropping message for closed channel");
            return;
        }

        let handler = self.inner.message_handler.lock().clone();
        match handler {
            Some(handler) => handler(message),
            None => {
                trace!(channel = %self.inner.id, "Holding message until a handler is set");
                self.inner.backlog.lock().push_back(message);
            }
        }
    }

    /// Marks the channel closed because the peer went away.
    ///
    /// Same notification rules as [`Channel::close`], but the sink is left
    /// alone since the transport already knows.
    pub fn mark_closed(&self) {
        if self.transition_to_closed() {
            debug!(channel = %self.inner.id, "Channel closed by peer");
            self.notify_state(ChannelState::Closed);
        }
    }
}

// ============================================================================
// Channel - Internal
// ============================================================================

impl Channel {
    /// Moves to closed; returns `false` if the channel already was.
    fn transition_to_closed(&self) -> bool {
        let mut state = self.inner.state.lock();
        if *state == ChannelState::Closed {
            return false;
        }
        *state = ChannelState::Closed;
        true
    }

    fn notify_state(&self, state: ChannelState) {
        let handler = self.inner.state_handler.lock().clone();
        if let Some(handler) = handler {
            handler(state);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
