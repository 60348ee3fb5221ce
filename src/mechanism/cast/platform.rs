//! Native casting capability.
//!
//! The casting SDK itself is outside this crate. These traits describe
//! the slice of it the cast mechanism consumes; an embedder implements
//! them over the real SDK (or over a fake in tests).
//!
//! A controller build only needs [`CastPlatform::initialize`] and
//! [`CastPlatform::request_session`]; a receiver build only needs
//! [`CastPlatform::start_receiver`]. Both hand out [`CastSession`]s.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Error;

// ============================================================================
// Types
// ============================================================================

/// Listener for string messages on one cast namespace.
pub type CastMessageListener = Arc<dyn Fn(String) + Send + Sync>;

/// Listener fired once when a session ends.
pub type CastEndedListener = Arc<dyn Fn() + Send + Sync>;

/// Listener fired by the receiver SDK when a sender connects.
///
/// Arguments are the sender id and the session bound to that sender.
pub type SenderConnectedListener = Arc<dyn Fn(String, Arc<dyn CastSession>) + Send + Sync>;

// ============================================================================
// CastError
// ============================================================================

/// Failures reported by the casting SDK.
///
/// Never surfaced to applications directly: the mechanism converts these
/// into [`Error::Operation`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CastError {
    /// The SDK is not loaded in this context.
    #[error("cast SDK unavailable")]
    Unavailable,

    /// The user or the device refused the session.
    #[error("cast session rejected: {0}")]
    SessionRejected(String),

    /// The session is no longer connected.
    #[error("cast session disconnected")]
    Disconnected,

    /// Any other SDK failure.
    #[error("cast SDK error: {0}")]
    Sdk(String),
}

impl From<CastError> for Error {
    fn from(err: CastError) -> Self {
        Error::operation(err.to_string())
    }
}

// ============================================================================
// CastSession
// ============================================================================

/// A live session with one cast peer.
///
/// On the controller side this is the session with the receiver
/// application; on the receiver side it is the link to one sender.
pub trait CastSession: Send + Sync {
    /// SDK session identifier.
    fn id(&self) -> String;

    /// Sends a string message on `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`CastError::Disconnected`] once the session has ended.
    fn send(&self, namespace: &str, payload: String) -> StdResult<(), CastError>;

    /// Installs or removes the message listener for `namespace`.
    fn set_message_listener(&self, namespace: &str, listener: Option<CastMessageListener>);

    /// Installs or removes the session-ended listener.
    fn set_ended_listener(&self, listener: Option<CastEndedListener>);

    /// Returns `true` while the session is connected.
    fn is_alive(&self) -> bool;

    /// Stops the session, ending the receiver application.
    fn stop(&self);
}

// ============================================================================
// CastPlatform
// ============================================================================

/// Entry points into the casting SDK.
#[async_trait]
pub trait CastPlatform: Send + Sync {
    /// Loads and initializes the controller SDK.
    ///
    /// Resolves to `true` when at least one receiver device is available.
    ///
    /// # Errors
    ///
    /// Returns [`CastError::Unavailable`] when the SDK cannot be loaded.
    async fn initialize(&self) -> StdResult<bool, CastError>;

    /// Asks the SDK to launch `app_id` on the receiver device.
    ///
    /// # Errors
    ///
    /// Returns [`CastError::SessionRejected`] if no session is granted.
    async fn request_session(&self, app_id: &str) -> StdResult<Arc<dyn CastSession>, CastError>;

    /// User agent string of the current context.
    fn user_agent(&self) -> String;

    /// Starts the receiver SDK and reports connecting senders.
    ///
    /// # Errors
    ///
    /// Returns [`CastError::Unavailable`] when the receiver SDK is absent.
    fn start_receiver(&self, on_sender: SenderConnectedListener) -> StdResult<(), CastError>;
}

// ============================================================================
// Tests
// ============================================================================
