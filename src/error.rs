//! Error types for the presentation shim.
//!
//! Every fallible operation returns [`Result<T>`] which uses [`Error`].
//! Operation failures always carry one of the five presentation kinds;
//! construction-time failures (builder validation, URL parsing) use the
//! two remaining variants.
//!
//! # Usage
//!
//! ```ignore
//! use presentation_shim::{ErrorKind, Result};
//!
//! async fn example(request: &PresentationRequest) -> Result<()> {
//!     match request.start().await {
//!         Ok(connection) => connection.send("next")?,
//!         Err(e) if e.kind() == ErrorKind::Abort => return Ok(()),
//!         Err(e) => return Err(e),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Discovery | [`Error::NotFound`], [`Error::Abort`] |
//! | Transport | [`Error::Operation`] |
//! | Lifecycle | [`Error::InvalidState`] |
//! | Feature | [`Error::NotSupported`] |
//! | Construction | [`Error::Config`], [`Error::InvalidUrl`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// ErrorKind
// ============================================================================

/// Coarse classification of an [`enum@Error`].
///
/// The first five kinds are the ones an application sees from
/// `start`, `reconnect`, `send` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No display discovered, or unknown presentation id.
    NotFound,
    /// The user declined to pick a display.
    Abort,
    /// Navigation or session establishment failed in the transport.
    Operation,
    /// The target is not in the state the operation requires.
    InvalidState,
    /// The feature is intentionally unimplemented.
    NotSupported,
    /// Invalid builder configuration.
    Config,
    /// Unparseable presentation URL.
    Syntax,
}

impl ErrorKind {
    /// Returns the DOM-style name of this kind.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NotFoundError",
            Self::Abort => "AbortError",
            Self::Operation => "OperationError",
            Self::InvalidState => "InvalidStateError",
            Self::NotSupported => "NotSupportedError",
            Self::Config => "ConfigError",
            Self::Syntax => "SyntaxError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// `Clone` so that one shared in-flight channel setup can hand the same
/// failure to every caller awaiting it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// Nothing to connect to.
    ///
    /// Returned when no mechanism reports a display, or when `reconnect`
    /// is given an id that was never registered for the URL.
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked for.
        message: String,
    },

    /// Display selection was declined.
    #[error("Aborted: {message}")]
    Abort {
        /// Why the selection ended without a display.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport-level failure.
    ///
    /// Returned for an unmapped cast URL, a blocked popup, a rejected
    /// native session, or a failed channel setup.
    #[error("Operation failed: {message}")]
    Operation {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Operation attempted in the wrong state.
    ///
    /// Returned by `send` on a closed or terminated connection.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the required state.
        message: String,
    },

    /// Unimplemented feature.
    #[error("Not supported: {feature}")]
    NotSupported {
        /// Name of the unsupported feature.
        feature: String,
    },

    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Presentation URL could not be parsed.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a not found error.
    #[inline]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an abort error.
    #[inline]
    pub fn abort(message: impl Into<String>) -> Self {
        Self::Abort {
            message: message.into(),
        }
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a not supported error.
    #[inline]
    pub fn not_supported(feature: impl Into<String>) -> Self {
        Self::NotSupported {
            feature: feature.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Abort { .. } => ErrorKind::Abort,
            Self::Operation { .. } => ErrorKind::Operation,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::NotSupported { .. } => ErrorKind::NotSupported,
            Self::Config { .. } => ErrorKind::Config,
            Self::InvalidUrl { .. } => ErrorKind::Syntax,
        }
    }

    /// Returns `true` if this is a not found error.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an abort error.
    #[inline]
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort { .. })
    }

    /// Returns `true` if this is an invalid state error.
    #[inline]
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Returns `true` if retrying `start()` from scratch may succeed.
    ///
    /// Discovery and transport failures depend on what is reachable at the
    /// moment; lifecycle and construction errors do not.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Abort { .. } | Self::Operation { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::operation("popup blocked");
        assert_eq!(err.to_string(), "Operation failed: popup blocked");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(Error::abort("x").kind(), ErrorKind::Abort);
        assert_eq!(Error::operation("x").kind(), ErrorKind::Operation);
        assert_eq!(Error::invalid_state("x").kind(), ErrorKind::InvalidState);
        assert_eq!(Error::not_supported("x").kind(), ErrorKind::NotSupported);
        assert_eq!(Error::config("x").kind(), ErrorKind::Config);
    }

    #[test]
    fn test_invalid_url_kind_is_syntax() {
        let source = url::Url::parse("not a url").unwrap_err();
        let err = Error::invalid_url("not a url", source);
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::NotFound.to_string(), "NotFoundError");
        assert_eq!(ErrorKind::InvalidState.as_str(), "InvalidStateError");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::not_found("no displays").is_retryable());
        assert!(Error::operation("rejected").is_retryable());
        assert!(!Error::invalid_state("closed").is_retryable());
        assert!(!Error::not_supported("availability").is_retryable());
    }

    #[test]
    fn test_error_is_clone() {
        let err = Error::abort("dismissed");
        assert_eq!(err.clone(), err);
    }
}
