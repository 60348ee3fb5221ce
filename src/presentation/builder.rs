//! Builder for a presentation context.
//!
//! # Example
//!
//! ```ignore
//! use presentation_shim::{CastMechanism, Presentation, WindowMechanism};
//!
//! let presentation = Presentation::builder()
//!     .mechanism(cast)
//!     .mechanism(WindowMechanism::new(windows))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::mechanism::Mechanism;

use super::core::Presentation;
use super::selector::{DisplaySelector, FirstDisplay};

// ============================================================================
// PresentationBuilder
// ============================================================================

/// Builder for configuring a [`Presentation`] context.
///
/// Use [`Presentation::builder()`] to create a new builder.
#[derive(Default)]
pub struct PresentationBuilder {
    /// Registered mechanisms, in discovery order.
    mechanisms: Vec<Arc<dyn Mechanism>>,
    /// Display picker.
    selector: Option<Arc<dyn DisplaySelector>>,
}

impl fmt::Debug for PresentationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.mechanisms.iter().map(|m| m.name()).collect();
        f.debug_struct("PresentationBuilder")
            .field("mechanisms", &names)
            .field("custom_selector", &self.selector.is_some())
            .finish()
    }
}

// ============================================================================
// PresentationBuilder Implementation
// ============================================================================

impl PresentationBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mechanism.
    ///
    /// Registration order is discovery order: displays of earlier
    /// mechanisms are listed first.
    ///
    /// # Arguments
    ///
    /// * `mechanism` - Transport to register
    #[must_use]
    pub fn mechanism(mut self, mechanism: impl Mechanism + 'static) -> Self {
        self.mechanisms.push(Arc::new(mechanism));
        self
    }

    /// Registers an already shared mechanism.
    #[must_use]
    pub fn shared_mechanism(mut self, mechanism: Arc<dyn Mechanism>) -> Self {
        self.mechanisms.push(mechanism);
        self
    }

    /// Sets the display picker. Defaults to [`FirstDisplay`].
    #[must_use]
    pub fn selector(mut self, selector: impl DisplaySelector + 'static) -> Self {
        self.selector = Some(Arc::new(selector));
        self
    }

    /// Builds the context with validation.
    ///
    /// A context without mechanisms is valid; every `start()` on it fails
    /// with [`Error::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if two mechanisms share a name.
    pub fn build(self) -> Result<Presentation> {
        self.validate_mechanisms()?;

        let selector = self
            .selector
            .unwrap_or_else(|| Arc::new(FirstDisplay) as Arc<dyn DisplaySelector>);
        Ok(Presentation::new(self.mechanisms, selector))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PresentationBuilder {
    fn validate_mechanisms(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for mechanism in &self.mechanisms {
            if !seen.insert(mechanism.name()) {
                return Err(Error::config(format!(
                    "Mechanism '{}' is registered twice",
                    mechanism.name()
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
