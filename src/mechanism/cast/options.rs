//! Cast mechanism options.
//!
//! # Example
//!
//! ```ignore
//! use presentation_shim::mechanism::cast::CastOptions;
//!
//! let options = CastOptions::new()
//!     .with_display_name("Living room")
//!     .with_namespace("urn:x-cast:com.example.slides");
//! ```

// ============================================================================
// Imports
// ============================================================================

use regex::Regex;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Message namespace shared by controller and receiver builds.
pub const DEFAULT_NAMESPACE: &str = "urn:x-cast:org.w3c.webscreens.presentationapi.shim";

/// Name of the single cast display.
pub const DEFAULT_DISPLAY_NAME: &str = "Chromecast";

/// User agent marker of cast receiver devices.
pub const DEFAULT_RECEIVER_MARKER: &str = "CrKey";

// ============================================================================
// CastOptions
// ============================================================================

/// Cast mechanism configuration.
#[derive(Debug, Clone)]
pub struct CastOptions {
    /// Namespace carrying channel messages.
    pub namespace: String,

    /// Name reported for the cast display.
    pub display_name: String,

    /// Pattern matched against the user agent to detect a receiver.
    ///
    /// A heuristic: a receiver with an unusual user agent is missed, and a
    /// browser spoofing the marker is mistaken for a receiver.
    pub receiver_marker: Regex,
}

impl Default for CastOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl CastOptions {
    /// Creates options with the default namespace, name and marker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            receiver_marker: Regex::new(DEFAULT_RECEIVER_MARKER)
                .expect("default receiver marker is a valid pattern"),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl CastOptions {
    /// Sets the message namespace.
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the display name.
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the receiver user agent pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `pattern` is not a valid regex.
    pub fn with_receiver_marker(mut self, pattern: &str) -> Result<Self> {
        self.receiver_marker = Regex::new(pattern)
            .map_err(|e| Error::config(format!("invalid receiver marker '{pattern}': {e}")))?;
        Ok(self)
    }
}

// ============================================================================
// Queries
// ============================================================================

impl CastOptions {
    /// Returns `true` if `user_agent` looks like a cast receiver.
    #[inline]
    #[must_use]
    pub fn is_receiver(&self, user_agent: &str) -> bool {
        self.receiver_marker.is_match(user_agent)
    }
}

// ============================================================================
// Tests
// ============================================================================
