//! Presentation context.
//!
//! A [`Presentation`] owns everything shared between requests and the
//! receiver: the mechanism list, the display selector, the record registry
//! and the availability flag.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::IdSequence;
use crate::mechanism::{Display, Mechanism};

use super::availability::Availability;
use super::builder::PresentationBuilder;
use super::receiver::PresentationReceiver;
use super::registry::{PresentationRecord, PresentationRegistry};
use super::request::PresentationRequest;
use super::selector::DisplaySelector;

// ============================================================================
// Presentation
// ============================================================================

/// Internal shared state for a presentation context.
pub(crate) struct PresentationInner {
    pub(crate) mechanisms: Vec<Arc<dyn Mechanism>>,
    pub(crate) selector: Arc<dyn DisplaySelector>,
    pub(crate) registry: PresentationRegistry,
    pub(crate) availability: Availability,
    receiver: PresentationReceiver,
}

/// Entry point of the presentation API.
///
/// Cheap to clone; clones share the same registry and mechanisms.
///
/// # Example
///
/// ```ignore
/// let presentation = Presentation::builder()
///     .mechanism(WindowMechanism::new(windows))
///     .build()?;
///
/// let request = presentation.request("https://slides.example/receiver.html")?;
/// let connection = request.start().await?;
/// connection.send("next")?;
/// ```
#[derive(Clone)]
pub struct Presentation {
    inner: Arc<PresentationInner>,
}

impl fmt::Debug for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presentation")
            .field("mechanisms", &self.mechanism_names())
            .field("available", &self.inner.availability.value())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Presentation - Constructor
// ============================================================================

impl Presentation {
    /// Creates a builder for configuring a presentation context.
    #[inline]
    #[must_use]
    pub fn builder() -> PresentationBuilder {
        PresentationBuilder::new()
    }

    pub(crate) fn new(
        mechanisms: Vec<Arc<dyn Mechanism>>,
        selector: Arc<dyn DisplaySelector>,
    ) -> Self {
        let ids = Arc::new(IdSequence::new());
        let receiver = PresentationReceiver::new(mechanisms.clone(), Arc::clone(&ids));
        debug!(mechanisms = mechanisms.len(), "Presentation context created");

        Self {
            inner: Arc::new(PresentationInner {
                mechanisms,
                selector,
                registry: PresentationRegistry::new(ids),
                availability: Availability::new(),
                receiver,
            }),
        }
    }
}

// ============================================================================
// Presentation - Public API
// ============================================================================

impl Presentation {
    /// Creates a request for presenting `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` cannot be parsed.
    pub fn request(&self, url: &str) -> Result<PresentationRequest> {
        let url = Url::parse(url).map_err(|e| Error::invalid_url(url, e))?;
        Ok(PresentationRequest::new(Arc::clone(&self.inner), url))
    }

    /// Returns the receiver side of this context.
    #[inline]
    #[must_use]
    pub fn receiver(&self) -> PresentationReceiver {
        self.inner.receiver.clone()
    }

    /// Returns the availability flag.
    #[inline]
    #[must_use]
    pub fn availability(&self) -> Availability {
        self.inner.availability.clone()
    }

    /// Returns every presentation started from this context.
    #[must_use]
    pub fn records(&self) -> Vec<PresentationRecord> {
        self.inner.registry.snapshot()
    }

    /// Returns the registered mechanism names in discovery order.
    #[must_use]
    pub fn mechanism_names(&self) -> Vec<&str> {
        self.inner.mechanisms.iter().map(|m| m.name()).collect()
    }
}

// ============================================================================
// PresentationInner - Discovery
// ============================================================================

impl PresentationInner {
    /// Asks every mechanism for displays and concatenates the answers in
    /// registration order.
    pub(crate) async fn discover(&self) -> Vec<Arc<dyn Display>> {
        let rounds = join_all(self.mechanisms.iter().map(|m| m.available_displays())).await;

        let mut displays = Vec::new();
        for (mechanism, found) in self.mechanisms.iter().zip(rounds) {
            trace!(mechanism = mechanism.name(), count = found.len(), "Discovery round");
            displays.extend(found);
        }

        self.availability.update(!displays.is_empty());
        displays
    }
}

// ============================================================================
// Tests
// ============================================================================
