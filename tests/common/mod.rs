//! Shared mocks for integration tests.
//!
//! - [`MockMechanism`] reports a fixed set of [`MockDisplay`]s and lets a
//!   test inject inbound controllers.
//! - Channels are in-memory pipes; the remote ends are kept so tests can
//!   play the other side.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;
use url::Url;

use presentation_shim::mechanism::IncomingControllerHandler;
use presentation_shim::{
    Channel, Display, DisplayOption, DisplaySelector, Error, Mechanism, PeerHandle,
    RemoteController, Result, pipe,
};

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber honoring `RUST_LOG`. Safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PipeEnds
// ============================================================================

/// Remote ends of the pipes handed out by a mock peer.
#[derive(Default)]
pub struct PipeEnds {
    ends: Mutex<Vec<Channel>>,
}

impl PipeEnds {
    fn open(&self) -> Channel {
        let (local, remote) = pipe();
        self.ends.lock().push(remote);
        local
    }

    /// Most recent remote end.
    pub fn last(&self) -> Channel {
        self.ends.lock().last().cloned().expect("a channel was created")
    }

    /// Number of channels created.
    pub fn count(&self) -> usize {
        self.ends.lock().len()
    }
}

// ============================================================================
// MockDisplay
// ============================================================================

/// Display with call counters and switchable failures.
pub struct MockDisplay {
    pub name: String,
    pub mechanism: String,
    pub navigations: AtomicUsize,
    pub creates: AtomicUsize,
    pub terminations: AtomicUsize,
    pub fail_navigate: AtomicBool,
    pub fail_channel: AtomicBool,
    pub gate: Mutex<Option<Arc<Notify>>>,
    pub remote: PipeEnds,
}

impl MockDisplay {
    pub fn new(name: &str, mechanism: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            mechanism: mechanism.to_string(),
            navigations: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            terminations: AtomicUsize::new(0),
            fail_navigate: AtomicBool::new(false),
            fail_channel: AtomicBool::new(false),
            gate: Mutex::new(None),
            remote: PipeEnds::default(),
        })
    }

    /// Makes channel creation wait until the returned notify fires.
    pub fn gate_channel(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerHandle for MockDisplay {
    fn mechanism(&self) -> &str {
        &self.mechanism
    }

    async fn create_channel(&self) -> Result<Channel> {
        self.creates.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_channel.load(Ordering::SeqCst) {
            return Err(Error::operation("mock channel refused"));
        }
        Ok(self.remote.open())
    }

    async fn terminate(&self) -> Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Display for MockDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    async fn navigate(&self, _url: &Url) -> Result<()> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        if self.fail_navigate.load(Ordering::SeqCst) {
            return Err(Error::invalid_state("mock display cannot navigate"));
        }
        Ok(())
    }
}

// ============================================================================
// MockController
// ============================================================================

/// Inbound controller over a pipe.
pub struct MockController {
    pub peer_id: String,
    pub fail_channel: bool,
    pub remote: PipeEnds,
}

impl MockController {
    pub fn new(peer_id: &str) -> Arc<Self> {
        Arc::new(Self {
            peer_id: peer_id.to_string(),
            fail_channel: false,
            remote: PipeEnds::default(),
        })
    }

    pub fn failing(peer_id: &str) -> Arc<Self> {
        Arc::new(Self {
            peer_id: peer_id.to_string(),
            fail_channel: true,
            remote: PipeEnds::default(),
        })
    }
}

#[async_trait]
impl PeerHandle for MockController {
    fn mechanism(&self) -> &str {
        "mock"
    }

    async fn create_channel(&self) -> Result<Channel> {
        if self.fail_channel {
            return Err(Error::operation("mock controller refused"));
        }
        Ok(self.remote.open())
    }

    async fn terminate(&self) -> Result<()> {
        Ok(())
    }
}

impl RemoteController for MockController {
    fn peer_id(&self) -> String {
        self.peer_id.clone()
    }
}

// ============================================================================
// MockMechanism
// ============================================================================

/// Mechanism with fixed displays and injectable controllers.
#[derive(Clone)]
pub struct MockMechanism {
    name: String,
    displays: Arc<Mutex<Vec<Arc<MockDisplay>>>>,
    handler: Arc<Mutex<Option<IncomingControllerHandler>>>,
    pub discoveries: Arc<AtomicUsize>,
    pub monitor_calls: Arc<AtomicUsize>,
}

impl MockMechanism {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            displays: Arc::new(Mutex::new(Vec::new())),
            handler: Arc::new(Mutex::new(None)),
            discoveries: Arc::new(AtomicUsize::new(0)),
            monitor_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Adds a display and returns it for inspection.
    pub fn add_display(&self, name: &str) -> Arc<MockDisplay> {
        let display = MockDisplay::new(name, &self.name);
        self.displays.lock().push(Arc::clone(&display));
        display
    }

    /// Reports an inbound controller, as a transport would.
    pub fn connect(&self, controller: Arc<MockController>) {
        let handler = self.handler.lock().clone().expect("monitoring started");
        handler(controller);
    }

    pub fn is_monitoring(&self) -> bool {
        self.handler.lock().is_some()
    }
}

#[async_trait]
impl Mechanism for MockMechanism {
    fn name(&self) -> &str {
        &self.name
    }

    async fn available_displays(&self) -> Vec<Arc<dyn Display>> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        self.displays
            .lock()
            .iter()
            .map(|display| Arc::clone(display) as Arc<dyn Display>)
            .collect()
    }

    fn monitor_incoming_controllers(&self, handler: IncomingControllerHandler) {
        self.monitor_calls.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.handler.lock();
        if slot.is_none() {
            *slot = Some(handler);
        }
    }
}

// ============================================================================
// Selectors
// ============================================================================

/// Selector returning a fixed answer and counting calls.
pub struct CountingSelector {
    answer: Option<usize>,
    pub calls: Arc<AtomicUsize>,
    pub last_options: Arc<Mutex<Vec<DisplayOption>>>,
}

impl CountingSelector {
    pub fn new(answer: Option<usize>) -> Self {
        Self {
            answer,
            calls: Arc::new(AtomicUsize::new(0)),
            last_options: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DisplaySelector for CountingSelector {
    async fn select(&self, _url: &Url, options: &[DisplayOption]) -> Option<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock() = options.to_vec();
        self.answer
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Presentation URL used across tests.
pub const SLIDES_URL: &str = "https://slides.example/receiver.html";
