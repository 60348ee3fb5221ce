//! OS windowing capability.
//!
//! The window mechanism sees the host only through these traits. Each
//! [`WindowSystem`] is one browsing context: it can open child windows,
//! may have an opener, and receives messages posted to it together with
//! the id of the posting window.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use url::Url;

use crate::channel::Message;
use crate::identifiers::WindowId;

// ============================================================================
// Types
// ============================================================================

/// Listener for messages posted to the current context.
///
/// Arguments are the id of the sending window and the message.
pub type WindowMessageListener = Arc<dyn Fn(WindowId, Message) + Send + Sync>;

// ============================================================================
// WindowHandle
// ============================================================================

/// Reference to another window.
pub trait WindowHandle: Send + Sync {
    /// Identity of the referenced window.
    fn id(&self) -> WindowId;

    /// Posts a message to the window. Delivery is asynchronous and lossy
    /// once the window is closed.
    fn post_message(&self, message: Message);

    /// Closes the window.
    fn close(&self);

    /// Returns `true` once the window is gone.
    fn is_closed(&self) -> bool;
}

// ============================================================================
// WindowSystem
// ============================================================================

/// The current browsing context.
pub trait WindowSystem: Send + Sync {
    /// Returns `false` when windows cannot be opened at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Opens `url` in a window called `name`.
    ///
    /// Returns `None` when the host refuses, e.g. a blocked popup.
    fn open(&self, url: &Url, name: &str) -> Option<Arc<dyn WindowHandle>>;

    /// The window that opened this context, if any.
    fn opener(&self) -> Option<Arc<dyn WindowHandle>>;

    /// Installs the listener for messages posted to this context.
    fn set_message_listener(&self, listener: WindowMessageListener);
}
