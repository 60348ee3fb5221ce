//! Native casting mechanism.
//!
//! Talks to a cast device through a [`CastPlatform`] supplied by the
//! embedder.
//!
//! # Controller Side
//!
//! ```text
//! available_displays ─► initialize() ─► one "Chromecast" display
//! navigate(url)      ─► app id lookup ─► request_session(app_id)
//! create_channel     ─► namespace listener on the session
//! terminate          ─► session.stop()
//! ```
//!
//! The SDK picks the actual device, so discovery never enumerates more
//! than one display. A URL must be registered with
//! [`CastMechanism::register_application`] before it can be cast.
//!
//! # Receiver Side
//!
//! When the user agent matches [`CastOptions::receiver_marker`],
//! monitoring starts the receiver SDK and reports each connecting sender
//! once as a [`CastController`].
//!
//! # Wire Format
//!
//! Channel messages travel as JSON [`Message`] envelopes. A payload that
//! is not an envelope is delivered as [`Message::Text`], so plain string
//! senders interoperate.

// ============================================================================
// Submodules
// ============================================================================

/// Cast mechanism options.
pub mod options;

/// Native casting capability traits.
pub mod platform;

// ============================================================================
// Re-exports
// ============================================================================

pub use options::CastOptions;
pub use platform::{
    CastEndedListener, CastError, CastMessageListener, CastPlatform, CastSession,
    SenderConnectedListener,
};

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::channel::{Channel, ChannelSink, Message};
use crate::error::{Error, Result};

use super::{Display, IncomingControllerHandler, Mechanism, PeerHandle, RemoteController};

// ============================================================================
// Constants
// ============================================================================

/// Mechanism name.
pub const CAST_MECHANISM: &str = "cast";

// ============================================================================
// CastMechanism
// ============================================================================

/// Internal shared state for the cast mechanism.
struct CastInner {
    platform: Arc<dyn CastPlatform>,
    options: CastOptions,
    applications: RwLock<FxHashMap<Url, String>>,
    monitoring: AtomicBool,
    senders: Mutex<FxHashSet<String>>,
}

/// Mechanism backed by a native casting SDK.
///
/// Clones share the application table, so a handle kept by the
/// application can register URLs after the mechanism was handed to the
/// builder.
///
/// # Example
///
/// ```ignore
/// let cast = CastMechanism::new(platform);
/// cast.register_application("https://slides.example/receiver.html", "5CB45E5A")?;
///
/// let presentation = Presentation::builder().mechanism(cast.clone()).build()?;
/// ```
#[derive(Clone)]
pub struct CastMechanism {
    inner: Arc<CastInner>,
}

impl fmt::Debug for CastMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastMechanism")
            .field("namespace", &self.inner.options.namespace)
            .field("applications", &self.inner.applications.read().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CastMechanism - Constructor
// ============================================================================

impl CastMechanism {
    /// Creates a cast mechanism with default options.
    pub fn new(platform: Arc<dyn CastPlatform>) -> Self {
        Self::with_options(platform, CastOptions::new())
    }

    /// Creates a cast mechanism with custom options.
    pub fn with_options(platform: Arc<dyn CastPlatform>, options: CastOptions) -> Self {
        Self {
            inner: Arc::new(CastInner {
                platform,
                options,
                applications: RwLock::new(FxHashMap::default()),
                monitoring: AtomicBool::new(false),
                senders: Mutex::new(FxHashSet::default()),
            }),
        }
    }
}

// ============================================================================
// CastMechanism - Application Table
// ============================================================================

impl CastMechanism {
    /// Maps a presentation URL to a cast application id.
    ///
    /// Must happen before `start()` targets `url` over cast. Registering
    /// the same URL again replaces the previous id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` cannot be parsed.
    pub fn register_application(&self, url: &str, app_id: impl Into<String>) -> Result<()> {
        let url = Url::parse(url).map_err(|e| Error::invalid_url(url, e))?;
        let app_id = app_id.into();
        debug!(url = %url, app_id = %app_id, "Registered cast application");
        self.inner.applications.write().insert(url, app_id);
        Ok(())
    }

    /// Returns the application id registered for `url`.
    #[must_use]
    pub fn application_for(&self, url: &Url) -> Option<String> {
        self.inner.applications.read().get(url).cloned()
    }

    /// Returns the mechanism options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &CastOptions {
        &self.inner.options
    }
}

// ============================================================================
// CastMechanism - Mechanism
// ============================================================================

#[async_trait]
impl Mechanism for CastMechanism {
    fn name(&self) -> &str {
        CAST_MECHANISM
    }

    async fn available_displays(&self) -> Vec<Arc<dyn Display>> {
        match self.inner.platform.initialize().await {
            Ok(true) => {
                trace!("Cast receiver available");
                vec![Arc::new(CastDisplay::new(Arc::clone(&self.inner))) as Arc<dyn Display>]
            }
            Ok(false) => {
                trace!("No cast receiver available");
                Vec::new()
            }
            Err(e) => {
                debug!(error = %e, "Cast SDK not usable, reporting no displays");
                Vec::new()
            }
        }
    }

    fn monitor_incoming_controllers(&self, handler: IncomingControllerHandler) {
        let user_agent = self.inner.platform.user_agent();
        if !self.inner.options.is_receiver(&user_agent) {
            debug!("Not a cast receiver context");
            return;
        }

        if self.inner.monitoring.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let on_sender: SenderConnectedListener = Arc::new(move |sender_id, session| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.senders.lock().insert(sender_id.clone()) {
                trace!(sender = %sender_id, "Sender already reported");
                return;
            }

            info!(sender = %sender_id, "Cast sender connected");
            handler(Arc::new(CastController {
                sender_id,
                session,
                namespace: inner.options.namespace.clone(),
            }));
        });

        if let Err(e) = self.inner.platform.start_receiver(on_sender) {
            warn!(error = %e, "Cast receiver SDK failed to start");
            self.inner.monitoring.store(false, Ordering::SeqCst);
        }
    }
}

// ============================================================================
// CastDisplay
// ============================================================================

/// The single cast device offered during selection.
pub struct CastDisplay {
    mechanism: Arc<CastInner>,
    session: Mutex<Option<Arc<dyn CastSession>>>,
}

impl CastDisplay {
    fn new(mechanism: Arc<CastInner>) -> Self {
        Self {
            mechanism,
            session: Mutex::new(None),
        }
    }

    fn session(&self) -> Option<Arc<dyn CastSession>> {
        self.session.lock().clone()
    }
}

#[async_trait]
impl PeerHandle for CastDisplay {
    fn mechanism(&self) -> &str {
        CAST_MECHANISM
    }

    async fn create_channel(&self) -> Result<Channel> {
        let session = self
            .session()
            .ok_or_else(|| Error::invalid_state("cast display has not been navigated"))?;

        if !session.is_alive() {
            return Err(CastError::Disconnected.into());
        }

        Ok(open_channel(session, &self.mechanism.options.namespace))
    }

    async fn terminate(&self) -> Result<()> {
        if let Some(session) = self.session.lock().take() {
            info!(session = %session.id(), "Stopping cast session");
            session.stop();
        }
        Ok(())
    }
}

#[async_trait]
impl Display for CastDisplay {
    fn name(&self) -> &str {
        &self.mechanism.options.display_name
    }

    async fn navigate(&self, url: &Url) -> Result<()> {
        let app_id = self
            .mechanism
            .applications
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::operation(format!("no cast application registered for {url}")))?;

        debug!(url = %url, app_id = %app_id, "Requesting cast session");
        let session = self.mechanism.platform.request_session(&app_id).await?;

        info!(session = %session.id(), app_id = %app_id, "Cast session started");
        *self.session.lock() = Some(session);
        Ok(())
    }
}

// ============================================================================
// CastController
// ============================================================================

/// A sender connected to this cast receiver.
pub struct CastController {
    sender_id: String,
    session: Arc<dyn CastSession>,
    namespace: String,
}

#[async_trait]
impl PeerHandle for CastController {
    fn mechanism(&self) -> &str {
        CAST_MECHANISM
    }

    async fn create_channel(&self) -> Result<Channel> {
        if !self.session.is_alive() {
            return Err(CastError::Disconnected.into());
        }
        Ok(open_channel(Arc::clone(&self.session), &self.namespace))
    }

    async fn terminate(&self) -> Result<()> {
        info!(sender = %self.sender_id, "Disconnecting cast sender");
        self.session.stop();
        Ok(())
    }
}

impl RemoteController for CastController {
    fn peer_id(&self) -> String {
        self.sender_id.clone()
    }
}

// ============================================================================
// Channel Plumbing
// ============================================================================

/// Sink writing envelopes onto a cast namespace.
struct CastSink {
    session: Arc<dyn CastSession>,
    namespace: String,
}

impl ChannelSink for CastSink {
    fn deliver(&self, message: Message) -> Result<()> {
        let payload = serde_json::to_string(&message)
            .map_err(|e| Error::operation(format!("cannot encode cast message: {e}")))?;
        self.session.send(&self.namespace, payload)?;
        Ok(())
    }

    fn close(&self) {
        self.session.set_message_listener(&self.namespace, None);
        self.session.set_ended_listener(None);
    }
}

/// Opens a channel over `session`, replacing any earlier listeners.
fn open_channel(session: Arc<dyn CastSession>, namespace: &str) -> Channel {
    let channel = Channel::new(CastSink {
        session: Arc::clone(&session),
        namespace: namespace.to_string(),
    });

    let weak = channel.downgrade();
    session.set_message_listener(
        namespace,
        Some(Arc::new(move |payload: String| {
            let Some(channel) = weak.upgrade() else {
                return;
            };
            let message = match serde_json::from_str::<Message>(&payload) {
                Ok(message) => message,
                Err(_) => Message::Text(payload),
            };
            channel.dispatch_message(message);
        })),
    );

    let weak = channel.downgrade();
    session.set_ended_listener(Some(Arc::new(move || {
        if let Some(channel) = weak.upgrade() {
            channel.mark_closed();
        }
    })));

    debug!(session = %session.id(), channel = %channel.id(), "Cast channel opened");
    channel
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::result::Result as StdResult;

    use crate::channel::ChannelState;

    /// Session recording sends and exposing its listeners.
    #[derive(Default)]
    struct FakeSession {
        sent: Mutex<Vec<(String, String)>>,
        listener: Mutex<Option<CastMessageListener>>,
        ended: Mutex<Option<CastEndedListener>>,
        stopped: AtomicBool,
    }

    impl FakeSession {
        fn receive(&self, payload: &str) {
            let listener = self.listener.lock().clone();
            if let Some(listener) = listener {
                listener(payload.to_string());
            }
        }

        fn end(&self) {
            let ended = self.ended.lock().clone();
            if let Some(ended) = ended {
                ended();
            }
        }
    }

    impl CastSession for FakeSession {
        fn id(&self) -> String {
            "session-1".into()
        }

        fn send(&self, namespace: &str, payload: String) -> StdResult<(), CastError> {
            self.sent.lock().push((namespace.to_string(), payload));
            Ok(())
        }

        fn set_message_listener(&self, _namespace: &str, listener: Option<CastMessageListener>) {
            *self.listener.lock() = listener;
        }

        fn set_ended_listener(&self, listener: Option<CastEndedListener>) {
            *self.ended.lock() = listener;
        }

        fn is_alive(&self) -> bool {
            !self.stopped.load(Ordering::SeqCst)
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    /// Platform granting one session, or none when unavailable.
    struct FakePlatform {
        available: StdResult<bool, CastError>,
        user_agent: String,
        session: Arc<FakeSession>,
        listener: Mutex<Option<SenderConnectedListener>>,
        receiver_starts: Mutex<usize>,
    }

    impl FakePlatform {
        fn new(available: StdResult<bool, CastError>) -> Arc<Self> {
            Arc::new(Self {
                available,
                user_agent: "Mozilla/5.0 Firefox/130.0".into(),
                session: Arc::new(FakeSession::default()),
                listener: Mutex::new(None),
                receiver_starts: Mutex::new(0),
            })
        }

        fn receiver() -> Arc<Self> {
            Arc::new(Self {
                available: Ok(false),
                user_agent: "Mozilla/5.0 CrKey/1.56".into(),
                session: Arc::new(FakeSession::default()),
                listener: Mutex::new(None),
                receiver_starts: Mutex::new(0),
            })
        }

        fn connect_sender(&self, sender_id: &str) {
            let listener = self.listener.lock().clone();
            if let Some(listener) = listener {
                listener(
                    sender_id.to_string(),
                    Arc::clone(&self.session) as Arc<dyn CastSession>,
                );
            }
        }
    }

    #[async_trait]
    impl CastPlatform for FakePlatform {
        async fn initialize(&self) -> StdResult<bool, CastError> {
            self.available.clone()
        }

        async fn request_session(
            &self,
            _app_id: &str,
        ) -> StdResult<Arc<dyn CastSession>, CastError> {
            Ok(Arc::clone(&self.session) as Arc<dyn CastSession>)
        }

        fn user_agent(&self) -> String {
            self.user_agent.clone()
        }

        fn start_receiver(&self, on_sender: SenderConnectedListener) -> StdResult<(), CastError> {
            *self.receiver_starts.lock() += 1;
            *self.listener.lock() = Some(on_sender);
            Ok(())
        }
    }

    const URL: &str = "https://slides.example/receiver.html";

    #[tokio::test]
    async fn test_single_display_when_available() {
        let cast = CastMechanism::new(FakePlatform::new(Ok(true)));
        let displays = cast.available_displays().await;
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].name(), options::DEFAULT_DISPLAY_NAME);
    }

    #[tokio::test]
    async fn test_no_displays_when_sdk_missing() {
        let cast = CastMechanism::new(FakePlatform::new(Err(CastError::Unavailable)));
        assert!(cast.available_displays().await.is_empty());

        let cast = CastMechanism::new(FakePlatform::new(Ok(false)));
        assert!(cast.available_displays().await.is_empty());
    }

    #[tokio::test]
    async fn test_navigate_unmapped_url_is_operation_error() {
        let cast = CastMechanism::new(FakePlatform::new(Ok(true)));
        let display = cast.available_displays().await.remove(0);

        let url = Url::parse(URL).expect("url");
        let err = display.navigate(&url).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Operation);
    }

    #[tokio::test]
    async fn test_channel_before_navigate_is_invalid_state() {
        let cast = CastMechanism::new(FakePlatform::new(Ok(true)));
        let display = cast.available_displays().await.remove(0);

        let err = display.create_channel().await.unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[tokio::test]
    async fn test_channel_roundtrip_over_session() {
        let platform = FakePlatform::new(Ok(true));
        let cast = CastMechanism::new(Arc::clone(&platform) as Arc<dyn CastPlatform>);
        cast.register_application(URL, "APP1").expect("register");

        let display = cast.available_displays().await.remove(0);
        display.navigate(&Url::parse(URL).expect("url")).await.expect("navigate");
        let channel = display.create_channel().await.expect("channel");

        channel.send("next").expect("send");
        let sent = platform.session.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, options::DEFAULT_NAMESPACE);
        assert_eq!(sent[0].1, r#"{"type":"text","data":"next"}"#);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        channel.set_message_handler(move |m| seen_clone.lock().push(m));
        platform.session.receive(r#"{"type":"text","data":"ack"}"#);
        platform.session.receive("raw");
        assert_eq!(*seen.lock(), vec![Message::from("ack"), Message::from("raw")]);
    }

    #[tokio::test]
    async fn test_session_end_closes_channel() {
        let platform = FakePlatform::new(Ok(true));
        let cast = CastMechanism::new(Arc::clone(&platform) as Arc<dyn CastPlatform>);
        cast.register_application(URL, "APP1").expect("register");

        let display = cast.available_displays().await.remove(0);
        display.navigate(&Url::parse(URL).expect("url")).await.expect("navigate");
        let channel = display.create_channel().await.expect("channel");

        platform.session.end();
        assert_eq!(channel.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_terminate_stops_session() {
        let platform = FakePlatform::new(Ok(true));
        let cast = CastMechanism::new(Arc::clone(&platform) as Arc<dyn CastPlatform>);
        cast.register_application(URL, "APP1").expect("register");

        let display = cast.available_displays().await.remove(0);
        display.navigate(&Url::parse(URL).expect("url")).await.expect("navigate");
        display.terminate().await.expect("terminate");

        assert!(!platform.session.is_alive());
    }

    #[test]
    fn test_register_invalid_url() {
        let cast = CastMechanism::new(FakePlatform::new(Ok(true)));
        let err = cast.register_application("not a url", "APP1").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Syntax);
    }

    #[test]
    fn test_monitor_ignored_outside_receiver() {
        let platform = FakePlatform::new(Ok(true));
        let cast = CastMechanism::new(Arc::clone(&platform) as Arc<dyn CastPlatform>);
        cast.monitor_incoming_controllers(Arc::new(|_| panic!("not a receiver")));
        assert_eq!(*platform.receiver_starts.lock(), 0);
    }

    #[test]
    fn test_monitor_deduplicates_senders() {
        let platform = FakePlatform::receiver();
        let cast = CastMechanism::new(Arc::clone(&platform) as Arc<dyn CastPlatform>);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let handler: IncomingControllerHandler =
            Arc::new(move |controller| seen_clone.lock().push(controller.peer_id()));
        cast.monitor_incoming_controllers(Arc::clone(&handler));
        cast.monitor_incoming_controllers(handler);

        platform.connect_sender("sender-a");
        platform.connect_sender("sender-a");
        platform.connect_sender("sender-b");

        assert_eq!(*platform.receiver_starts.lock(), 1);
        assert_eq!(*seen.lock(), vec!["sender-a".to_string(), "sender-b".to_string()]);
    }
}
