//! In-memory window system.
//!
//! [`MemoryWindows`] models a tree of browsing contexts inside one process.
//! A context opened by another has it as opener, and messages posted
//! between contexts are delivered asynchronously, in order, by a pump task
//! per receiving context.
//!
//! # Ownership
//!
//! The opener owns every context it opened until [`MemoryWindows::next_opened`]
//! hands it out, the way a browser keeps a popup alive whether or not the
//! page holds a reference. An opened context that is never taken therefore
//! stays alive and queued for the opener's lifetime, and its handle reports
//! closed only through [`WindowHandle::close`]. Hosts that open many windows
//! should drain the queue.
//!
//! # Example
//!
//! ```ignore
//! let controller_host = MemoryWindows::root();
//! let controller = WindowMechanism::new(Arc::new(controller_host.clone()));
//!
//! // After the controller navigated, pick up the receiver context.
//! let receiver_host = controller_host.next_opened().await.expect("opened");
//! let receiver = WindowMechanism::new(Arc::new(receiver_host));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use url::Url;

use crate::channel::Message;
use crate::identifiers::WindowId;

use super::system::{WindowHandle, WindowMessageListener, WindowSystem};

// ============================================================================
// Types
// ============================================================================

/// A posted message together with the id of its sender.
type Envelope = (WindowId, Message);

// ============================================================================
// Context
// ============================================================================

/// Internal state of one browsing context.
struct Context {
    id: WindowId,
    url: Option<Url>,
    name: Option<String>,
    opener: Option<Weak<Context>>,
    closed: AtomicBool,
    popups_blocked: AtomicBool,
    available: AtomicBool,
    inbox: mpsc::UnboundedSender<Envelope>,
    pending_inbox: Mutex<Option<mpsc::UnboundedReceiver<Envelope>>>,
    listener: RwLock<Option<WindowMessageListener>>,
    opened_tx: mpsc::UnboundedSender<MemoryWindows>,
    opened_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MemoryWindows>>,
}

impl Context {
    fn new(url: Option<Url>, name: Option<String>, opener: Option<Weak<Context>>) -> Self {
        let (inbox, pending_inbox) = mpsc::unbounded_channel();
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();

        Self {
            id: WindowId::new(),
            url,
            name,
            opener,
            closed: AtomicBool::new(false),
            popups_blocked: AtomicBool::new(false),
            available: AtomicBool::new(true),
            inbox,
            pending_inbox: Mutex::new(Some(pending_inbox)),
            listener: RwLock::new(None),
            opened_tx,
            opened_rx: tokio::sync::Mutex::new(opened_rx),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MemoryWindows
// ============================================================================

/// One browsing context of an in-memory window tree.
///
/// Clones refer to the same context.
#[derive(Clone)]
pub struct MemoryWindows {
    context: Arc<Context>,
}

impl fmt::Debug for MemoryWindows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryWindows")
            .field("id", &self.context.id)
            .field("url", &self.context.url.as_ref().map(Url::as_str))
            .field("closed", &self.context.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MemoryWindows - Constructor
// ============================================================================

impl MemoryWindows {
    /// Creates a top-level context without an opener.
    #[must_use]
    pub fn root() -> Self {
        Self {
            context: Arc::new(Context::new(None, None, None)),
        }
    }
}

// ============================================================================
// MemoryWindows - Accessors
// ============================================================================

impl MemoryWindows {
    /// Returns the context id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> WindowId {
        self.context.id
    }

    /// Returns the URL this context was opened at.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&Url> {
        self.context.url.as_ref()
    }

    /// Returns the target name this context was opened with.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.context.name.as_deref()
    }

    /// Returns `true` once the context was closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.context.is_closed()
    }
}

// ============================================================================
// MemoryWindows - Host Controls
// ============================================================================

impl MemoryWindows {
    /// Makes subsequent `open` calls fail as a popup blocker would.
    pub fn set_popups_blocked(&self, blocked: bool) {
        self.context.popups_blocked.store(blocked, Ordering::SeqCst);
    }

    /// Toggles whether this context can open windows at all.
    pub fn set_available(&self, available: bool) {
        self.context.available.store(available, Ordering::SeqCst);
    }

    /// Waits for the next context opened from this one.
    ///
    /// Contexts closed before they were taken are skipped and released.
    pub async fn next_opened(&self) -> Option<MemoryWindows> {
        let mut opened = self.context.opened_rx.lock().await;
        loop {
            let window = opened.recv().await?;
            if !window.is_closed() {
                return Some(window);
            }
            trace!(window = %window.id(), "Skipping window closed before it was taken");
        }
    }
}

// ============================================================================
// MemoryWindows - WindowSystem
// ============================================================================

impl WindowSystem for MemoryWindows {
    fn is_available(&self) -> bool {
        self.context.available.load(Ordering::SeqCst)
    }

    fn open(&self, url: &Url, name: &str) -> Option<Arc<dyn WindowHandle>> {
        if self.context.popups_blocked.load(Ordering::SeqCst) {
            debug!(url = %url, "Popup blocked");
            return None;
        }

        let child = Arc::new(Context::new(
            Some(url.clone()),
            Some(name.to_string()),
            Some(Arc::downgrade(&self.context)),
        ));
        debug!(window = %child.id, url = %url, "Window opened");

        let handle = MemoryWindowHandle {
            id: child.id,
            target: Arc::downgrade(&child),
            from: self.context.id,
        };
        let _ = self.context.opened_tx.send(MemoryWindows { context: child });

        Some(Arc::new(handle))
    }

    fn opener(&self) -> Option<Arc<dyn WindowHandle>> {
        let opener = self.context.opener.as_ref()?;
        let id = opener.upgrade()?.id;

        Some(Arc::new(MemoryWindowHandle {
            id,
            target: opener.clone(),
            from: self.context.id,
        }))
    }

    fn set_message_listener(&self, listener: WindowMessageListener) {
        *self.context.listener.write() = Some(listener);

        let Some(inbox) = self.context.pending_inbox.lock().take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(pump(Arc::downgrade(&self.context), inbox));
            }
            Err(_) => {
                warn!(window = %self.context.id, "No runtime, messages will not be delivered");
                *self.context.pending_inbox.lock() = Some(inbox);
            }
        }
    }
}

/// Delivers posted messages to the context listener in order.
async fn pump(context: Weak<Context>, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
    while let Some((from, message)) = inbox.recv().await {
        let Some(context) = context.upgrade() else {
            break;
        };
        if context.is_closed() {
            trace!(window = %context.id, "Dropping message for closed window");
            continue;
        }

        let listener = context.listener.read().clone();
        if let Some(listener) = listener {
            listener(from, message);
        }
    }
}

// ============================================================================
// MemoryWindowHandle
// ============================================================================

/// Handle to a context, posting on behalf of another.
struct MemoryWindowHandle {
    id: WindowId,
    target: Weak<Context>,
    from: WindowId,
}

impl WindowHandle for MemoryWindowHandle {
    fn id(&self) -> WindowId {
        self.id
    }

    fn post_message(&self, message: Message) {
        match self.target.upgrade() {
            Some(target) if !target.is_closed() => {
                let _ = target.inbox.send((self.from, message));
            }
            _ => trace!(window = %self.id, "Dropping message for closed window"),
        }
    }

    fn close(&self) {
        if let Some(target) = self.target.upgrade()
            && !target.closed.swap(true, Ordering::SeqCst)
        {
            debug!(window = %self.id, "Window closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.target.upgrade().is_none_or(|target| target.is_closed())
    }
}

// ============================================================================
// Tests
// ============================================================================
