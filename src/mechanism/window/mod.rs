//! Attached-window mechanism.
//!
//! Covers both the attached-display build and the plain popup fallback:
//! the receiver runs in a window opened by the controller and the two
//! talk by posting messages.
//!
//! # Handshake
//!
//! ```text
//! controller                         receiver
//!     │ open(url) ───────────────────────►│
//!     │◄──────────────── "ispresentation" │  monitor_incoming_controllers
//!     │ "presentation" ──────────────────►│  incoming controller reported
//!     │                                   │
//!     │ "channel" ───────────────────────►│  create_channel (receiver)
//!     │◄────────────────── "channelready" │
//!     │◄═════════════ payloads ══════════►│
//!     │◄─────────────── "receivershutdown"│  terminate (receiver)
//! ```
//!
//! `navigate` resolves once the acknowledgement was posted. The receiving
//! context is detected by the presence of an opener window; a context
//! opened by something other than a controller is misdetected.
//!
//! Once a controller-side channel is ready only `receivershutdown` is
//! still read as control. On the receiver side only `channel` is, and a
//! repeated `channel` is answered at once so a controller can reconnect.
//!
//! Closing or terminating on the receiver side posts `receivershutdown`.
//! The link is then shut down for good on both ends: pending and later
//! channel setups fail with [`Error::Operation`] and further payloads are
//! dropped.
//!
//! Closing on the controller side is not signalled. The receiver stays
//! connected and its payloads are held by the controller, up to
//! [`MAX_HELD_PAYLOADS`], until a `reconnect` flushes them in order into
//! the new channel. Payloads beyond the cap are dropped.

// ============================================================================
// Submodules
// ============================================================================

/// In-memory window system.
pub mod memory;

/// Window mechanism options.
pub mod options;

/// Handshake tokens.
pub mod protocol;

/// Windowing capability traits.
pub mod system;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::MemoryWindows;
pub use options::WindowOptions;
pub use protocol::ControlToken;
pub use system::{WindowHandle, WindowMessageListener, WindowSystem};

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::channel::{Channel, ChannelSink, Message, WeakChannel};
use crate::error::{Error, Result};
use crate::identifiers::WindowId;

use super::{Display, IncomingControllerHandler, Mechanism, PeerHandle, RemoteController};

// ============================================================================
// Constants
// ============================================================================

/// Mechanism name.
pub const WINDOW_MECHANISM: &str = "window";

/// Payloads held per link while no channel is connected.
pub const MAX_HELD_PAYLOADS: usize = 256;

// ============================================================================
// LinkState
// ============================================================================

/// Handshake progress with one peer window.
///
/// [`Notify`] permits make every step safe against the peer answering
/// before the local side starts waiting.
struct LinkState {
    handle: Arc<dyn WindowHandle>,
    announced: Notify,
    channel_ready: Notify,
    channel_requested: Notify,
    shutdown_signal: Notify,
    shut_down: AtomicBool,
    channel: Mutex<Option<WeakChannel>>,
    early: Mutex<Vec<Message>>,
}

impl LinkState {
    fn new(handle: Arc<dyn WindowHandle>) -> Arc<Self> {
        Arc::new(Self {
            handle,
            announced: Notify::new(),
            channel_ready: Notify::new(),
            channel_requested: Notify::new(),
            shutdown_signal: Notify::new(),
            shut_down: AtomicBool::new(false),
            channel: Mutex::new(None),
            early: Mutex::new(Vec::new()),
        })
    }

    fn connected_channel(&self) -> Option<Channel> {
        self.channel
            .lock()
            .as_ref()
            .and_then(WeakChannel::upgrade)
            .filter(Channel::is_connected)
    }

    /// Binds a fresh channel and flushes payloads that arrived before it.
    fn set_channel(&self, channel: &Channel) {
        *self.channel.lock() = Some(channel.downgrade());

        let early = std::mem::take(&mut *self.early.lock());
        for message in early {
            channel.dispatch_message(message);
        }
    }

    fn hold(&self, message: Message) {
        if self.is_shut_down() {
            trace!(window = %self.handle.id(), "Dropping payload on shut down link");
            return;
        }
        let mut early = self.early.lock();
        if early.len() >= MAX_HELD_PAYLOADS {
            warn!(window = %self.handle.id(), "Held payload limit reached, dropping payload");
            return;
        }
        trace!(window = %self.handle.id(), "Holding payload until a channel exists");
        early.push(message);
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Marks the link shut down. Returns `false` if it already was.
    fn shut_down(&self) -> bool {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.early.lock().clear();
        self.shutdown_signal.notify_one();
        true
    }

    /// Receiver side: shuts the link down and tells the controller.
    fn announce_shutdown(&self) {
        if self.shut_down() {
            self.post(ControlToken::ReceiverShutdown);
        }
    }

    /// Waits for one handshake step unless the link shuts down first.
    async fn wait_step(&self, step: &Notify) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::operation("receiver shut down"));
        }
        tokio::select! {
            () = step.notified() => Ok(()),
            () = self.shutdown_signal.notified() => Err(Error::operation("receiver shut down")),
        }
    }

    fn post(&self, token: ControlToken) {
        trace!(window = %self.handle.id(), token = %token, "Posting control token");
        self.handle.post_message(token.to_message());
    }

    fn open_channel(self: &Arc<Self>, role: SinkRole) -> Channel {
        Channel::new(WindowSink {
            link: Arc::clone(self),
            role,
        })
    }
}

// ============================================================================
// WindowMechanism
// ============================================================================

/// Internal shared state for the window mechanism.
struct WindowInner {
    system: Arc<dyn WindowSystem>,
    options: WindowOptions,
    listening: AtomicBool,
    monitoring: AtomicBool,
    displays: Mutex<FxHashMap<WindowId, Arc<LinkState>>>,
    controller: Mutex<Option<Arc<LinkState>>>,
    incoming: Mutex<Option<IncomingControllerHandler>>,
    reported: Mutex<FxHashSet<WindowId>>,
}

/// Mechanism that presents in a window opened by the controller.
#[derive(Clone)]
pub struct WindowMechanism {
    inner: Arc<WindowInner>,
}

impl fmt::Debug for WindowMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowMechanism")
            .field("display_name", &self.inner.options.display_name)
            .field("open_windows", &self.inner.displays.lock().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WindowMechanism - Constructor
// ============================================================================

impl WindowMechanism {
    /// Creates a window mechanism with default options.
    pub fn new(system: Arc<dyn WindowSystem>) -> Self {
        Self::with_options(system, WindowOptions::new())
    }

    /// Creates a window mechanism with custom options.
    pub fn with_options(system: Arc<dyn WindowSystem>, options: WindowOptions) -> Self {
        Self {
            inner: Arc::new(WindowInner {
                system,
                options,
                listening: AtomicBool::new(false),
                monitoring: AtomicBool::new(false),
                displays: Mutex::new(FxHashMap::default()),
                controller: Mutex::new(None),
                incoming: Mutex::new(None),
                reported: Mutex::new(FxHashSet::default()),
            }),
        }
    }

    /// Returns the mechanism options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &WindowOptions {
        &self.inner.options
    }
}

// ============================================================================
// WindowMechanism - Mechanism
// ============================================================================

#[async_trait]
impl Mechanism for WindowMechanism {
    fn name(&self) -> &str {
        WINDOW_MECHANISM
    }

    async fn available_displays(&self) -> Vec<Arc<dyn Display>> {
        if !self.inner.system.is_available() {
            trace!("Window system unavailable");
            return Vec::new();
        }

        vec![Arc::new(WindowDisplay {
            mechanism: Arc::clone(&self.inner),
            link: Mutex::new(None),
        }) as Arc<dyn Display>]
    }

    fn monitor_incoming_controllers(&self, handler: IncomingControllerHandler) {
        let Some(opener) = self.inner.system.opener() else {
            debug!("No opener window, not a receiving context");
            return;
        };

        if self.inner.monitoring.swap(true, Ordering::SeqCst) {
            return;
        }

        *self.inner.incoming.lock() = Some(handler);
        let link = LinkState::new(opener);
        *self.inner.controller.lock() = Some(Arc::clone(&link));

        WindowInner::ensure_listening(&self.inner);
        debug!(opener = %link.handle.id(), "Announcing presentation to opener");
        link.post(ControlToken::IsPresentation);
    }
}

// ============================================================================
// WindowInner - Routing
// ============================================================================

impl WindowInner {
    fn ensure_listening(this: &Arc<Self>) {
        if this.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak = Arc::downgrade(this);
        this.system
            .set_message_listener(Arc::new(move |from: WindowId, message: Message| {
                if let Some(inner) = weak.upgrade() {
                    inner.route(from, message);
                }
            }));
    }

    fn route(&self, from: WindowId, message: Message) {
        let controller = self
            .controller
            .lock()
            .clone()
            .filter(|link| link.handle.id() == from);
        if let Some(link) = controller {
            self.route_from_controller(&link, message);
            return;
        }

        let display = self.displays.lock().get(&from).cloned();
        match display {
            Some(link) => Self::route_from_display(&link, message),
            None => trace!(window = %from, "Ignoring message from unknown window"),
        }
    }

    /// Controller side: messages from a receiver window.
    fn route_from_display(link: &LinkState, message: Message) {
        let token = ControlToken::parse(&message);

        if let Some(channel) = link.connected_channel() {
            match token {
                Some(ControlToken::ReceiverShutdown) => {
                    info!(window = %link.handle.id(), "Receiver shut down");
                    link.shut_down();
                    channel.mark_closed();
                }
                _ => channel.dispatch_message(message),
            }
            return;
        }

        match token {
            Some(ControlToken::IsPresentation) => {
                debug!(window = %link.handle.id(), "Receiver announced");
                link.post(ControlToken::Presentation);
                link.announced.notify_one();
            }
            Some(ControlToken::ChannelReady) => link.channel_ready.notify_one(),
            Some(ControlToken::ReceiverShutdown) => {
                debug!(window = %link.handle.id(), "Receiver shut down without a channel");
                link.shut_down();
            }
            _ => link.hold(message),
        }
    }

    /// Receiver side: messages from the opener.
    fn route_from_controller(&self, link: &Arc<LinkState>, message: Message) {
        let token = ControlToken::parse(&message);

        if let Some(channel) = link.connected_channel() {
            match token {
                Some(ControlToken::Channel) => link.post(ControlToken::ChannelReady),
                _ => channel.dispatch_message(message),
            }
            return;
        }

        match token {
            Some(ControlToken::Presentation) => self.report_controller(link),
            Some(ControlToken::Channel) => link.channel_requested.notify_one(),
            _ => link.hold(message),
        }
    }

    fn report_controller(&self, link: &Arc<LinkState>) {
        if !self.reported.lock().insert(link.handle.id()) {
            trace!(window = %link.handle.id(), "Controller already reported");
            return;
        }

        let handler = self.incoming.lock().clone();
        if let Some(handler) = handler {
            info!(opener = %link.handle.id(), "Controller connected");
            handler(Arc::new(WindowController {
                link: Arc::clone(link),
            }));
        }
    }
}

// ============================================================================
// WindowDisplay
// ============================================================================

/// A window the controller can open and present in.
pub struct WindowDisplay {
    mechanism: Arc<WindowInner>,
    link: Mutex<Option<Arc<LinkState>>>,
}

impl WindowDisplay {
    fn link(&self) -> Option<Arc<LinkState>> {
        self.link.lock().clone()
    }
}

#[async_trait]
impl PeerHandle for WindowDisplay {
    fn mechanism(&self) -> &str {
        WINDOW_MECHANISM
    }

    async fn create_channel(&self) -> Result<Channel> {
        let link = self
            .link()
            .ok_or_else(|| Error::invalid_state("presentation window has not been opened"))?;

        if link.handle.is_closed() {
            return Err(Error::operation("presentation window is closed"));
        }
        if link.is_shut_down() {
            return Err(Error::operation("receiver shut down"));
        }

        link.post(ControlToken::Channel);
        link.wait_step(&link.channel_ready).await?;

        let channel = link.open_channel(SinkRole::Controller);
        link.set_channel(&channel);
        debug!(window = %link.handle.id(), channel = %channel.id(), "Window channel ready");
        Ok(channel)
    }

    async fn terminate(&self) -> Result<()> {
        let Some(link) = self.link.lock().take() else {
            return Ok(());
        };

        info!(window = %link.handle.id(), "Closing presentation window");
        self.mechanism.displays.lock().remove(&link.handle.id());
        link.handle.close();
        Ok(())
    }
}

#[async_trait]
impl Display for WindowDisplay {
    fn name(&self) -> &str {
        &self.mechanism.options.display_name
    }

    async fn navigate(&self, url: &Url) -> Result<()> {
        WindowInner::ensure_listening(&self.mechanism);

        let handle = self
            .mechanism
            .system
            .open(url, &self.mechanism.options.window_name)
            .ok_or_else(|| Error::operation(format!("window for {url} was blocked")))?;

        let link = LinkState::new(handle);
        self.mechanism
            .displays
            .lock()
            .insert(link.handle.id(), Arc::clone(&link));
        *self.link.lock() = Some(Arc::clone(&link));

        debug!(window = %link.handle.id(), url = %url, "Waiting for receiver announcement");
        link.announced.notified().await;
        Ok(())
    }
}

// ============================================================================
// WindowController
// ============================================================================

/// The opener that presents in this window.
pub struct WindowController {
    link: Arc<LinkState>,
}

#[async_trait]
impl PeerHandle for WindowController {
    fn mechanism(&self) -> &str {
        WINDOW_MECHANISM
    }

    async fn create_channel(&self) -> Result<Channel> {
        if self.link.handle.is_closed() {
            return Err(Error::operation("opener window is closed"));
        }

        self.link.wait_step(&self.link.channel_requested).await?;

        let channel = self.link.open_channel(SinkRole::Receiver);
        self.link.set_channel(&channel);
        self.link.post(ControlToken::ChannelReady);
        debug!(opener = %self.link.handle.id(), channel = %channel.id(), "Window channel ready");
        Ok(channel)
    }

    async fn terminate(&self) -> Result<()> {
        info!(opener = %self.link.handle.id(), "Shutting receiver down");
        self.link.announce_shutdown();
        Ok(())
    }
}

impl RemoteController for WindowController {
    fn peer_id(&self) -> String {
        self.link.handle.id().to_string()
    }
}

// ============================================================================
// WindowSink
// ============================================================================

/// Which end of the link a sink writes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkRole {
    Controller,
    Receiver,
}

/// Sink posting payloads to the peer window.
struct WindowSink {
    link: Arc<LinkState>,
    role: SinkRole,
}

impl ChannelSink for WindowSink {
    fn deliver(&self, message: Message) -> Result<()> {
        let handle = &self.link.handle;
        if handle.is_closed() {
            warn!(window = %handle.id(), "Send to closed window");
            return Err(Error::operation("peer window is closed"));
        }
        handle.post_message(message);
        Ok(())
    }

    /// Closing on the receiver side shuts the whole link down.
    fn close(&self) {
        if self.role == SinkRole::Receiver {
            debug!(opener = %self.link.handle.id(), "Receiver channel closed");
            self.link.announce_shutdown();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
