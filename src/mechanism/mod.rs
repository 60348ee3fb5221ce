//! Transport mechanisms.
//!
//! A mechanism is one way of reaching a second screen. Each one knows how
//! to find candidate displays, navigate a display to a URL, open a channel
//! once connected, and notice inbound controllers when running on the
//! receiving side.
//!
//! # Roles
//!
//! | Trait | Side | Capabilities |
//! |-------|------|--------------|
//! | [`Mechanism`] | both | discovery, inbound monitoring |
//! | [`Display`] | controller | name, navigate, channel, terminate |
//! | [`RemoteController`] | receiver | peer id, channel, terminate |
//!
//! [`Display`] and [`RemoteController`] share [`PeerHandle`], and a
//! connection holds either one as a [`Peer`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `cast` | Native casting protocol |
//! | `window` | Attached/popup window with a postMessage handshake |

// ============================================================================
// Submodules
// ============================================================================

/// Native casting mechanism.
pub mod cast;

/// Attached-window mechanism.
pub mod window;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::channel::Channel;
use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Callback fired by a mechanism for each newly detected controller.
pub type IncomingControllerHandler = Arc<dyn Fn(Arc<dyn RemoteController>) + Send + Sync>;

// ============================================================================
// PeerHandle
// ============================================================================

/// Capabilities shared by both peer handle kinds.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    /// Name of the mechanism this peer belongs to.
    fn mechanism(&self) -> &str;

    /// Opens a new connected channel to the peer.
    ///
    /// # Errors
    ///
    /// - [`Error::Operation`](crate::Error::Operation) if the transport
    ///   cannot set the channel up
    /// - [`Error::InvalidState`](crate::Error::InvalidState) if the peer
    ///   is not yet reachable (e.g. a display that was never navigated)
    async fn create_channel(&self) -> Result<Channel>;

    /// Tears down the underlying transport resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`](crate::Error::Operation) if the
    /// transport reports a failure; the caller treats the peer as gone
    /// either way.
    async fn terminate(&self) -> Result<()>;
}

// ============================================================================
// Display
// ============================================================================

/// Controller-side handle to a candidate screen.
#[async_trait]
pub trait Display: PeerHandle {
    /// Human-readable name shown during selection.
    fn name(&self) -> &str;

    /// Loads `url` on the display and waits until it is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Operation`](crate::Error::Operation) if the
    /// display cannot be navigated.
    async fn navigate(&self, url: &Url) -> Result<()>;
}

// ============================================================================
// RemoteController
// ============================================================================

/// Receiver-side handle to an already connected controller.
pub trait RemoteController: PeerHandle {
    /// Transport identity of the controller, stable for its lifetime.
    fn peer_id(&self) -> String;
}

// ============================================================================
// Mechanism
// ============================================================================

/// A transport strategy for reaching second screens.
#[async_trait]
pub trait Mechanism: Send + Sync {
    /// Mechanism name, unique within one presentation context.
    fn name(&self) -> &str;

    /// Probes for displays reachable right now.
    ///
    /// Never fails: an unavailable transport yields an empty list. Every
    /// call probes afresh.
    async fn available_displays(&self) -> Vec<Arc<dyn Display>>;

    /// Starts listening for inbound controllers.
    ///
    /// Only listens when this execution context looks like a receiving
    /// context for the transport; otherwise does nothing. Repeated calls
    /// are ignored. `handler` fires at most once per controller.
    fn monitor_incoming_controllers(&self, handler: IncomingControllerHandler);
}

// ============================================================================
// Peer
// ============================================================================

/// The remote end a connection talks to.
#[derive(Clone)]
pub enum Peer {
    /// A display this context navigated.
    Display(Arc<dyn Display>),
    /// A controller that connected to this context.
    Controller(Arc<dyn RemoteController>),
}

impl Peer {
    /// Name of the owning mechanism.
    #[must_use]
    pub fn mechanism(&self) -> &str {
        match self {
            Self::Display(display) => display.mechanism(),
            Self::Controller(controller) => controller.mechanism(),
        }
    }

    /// Returns `true` for a controller-side peer.
    #[inline]
    #[must_use]
    pub fn is_display(&self) -> bool {
        matches!(self, Self::Display(_))
    }

    /// Opens a new channel to the peer.
    pub(crate) async fn create_channel(&self) -> Result<Channel> {
        match self {
            Self::Display(display) => display.create_channel().await,
            Self::Controller(controller) => controller.create_channel().await,
        }
    }

    /// Tears the peer's transport down.
    pub(crate) async fn terminate(&self) -> Result<()> {
        match self {
            Self::Display(display) => display.terminate().await,
            Self::Controller(controller) => controller.terminate().await,
        }
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display(display) => f
                .debug_struct("Display")
                .field("mechanism", &display.mechanism())
                .field("name", &display.name())
                .finish(),
            Self::Controller(controller) => f
                .debug_struct("Controller")
                .field("mechanism", &controller.mechanism())
                .field("peer_id", &controller.peer_id())
                .finish(),
        }
    }
}
