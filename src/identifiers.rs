//! Type-safe identifiers.
//!
//! Newtype wrappers keep presentation ids, channel ids and window ids
//! from being mixed up at compile time.
//!
//! | Type | Source | Scope |
//! |------|--------|-------|
//! | [`PresentationId`] | [`IdSequence`] | one registry |
//! | [`ChannelId`] | process-wide counter | logging only |
//! | [`WindowId`] | random UUID | one window system |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// PresentationId
// ============================================================================

/// Identifier of a presentation connection.
///
/// Rendered as a decimal string, which is what `reconnect` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PresentationId(u64);

impl PresentationId {
    /// Returns the raw sequence number.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PresentationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

// ============================================================================
// IdSequence
// ============================================================================

/// Monotonic source of [`PresentationId`]s.
///
/// Ids start at 1 and are never reused within one sequence.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: AtomicU64,
}

impl IdSequence {
    /// Creates a sequence whose first id is 1.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Mints the next id.
    #[inline]
    pub fn next(&self) -> PresentationId {
        PresentationId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ============================================================================
// ChannelId
// ============================================================================

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one channel instance, used in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocates a new process-unique channel id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch-{}", self.0)
    }
}

// ============================================================================
// WindowId
// ============================================================================

/// Identity of a window, used as the sender identity of posted messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(Uuid);

impl WindowId {
    /// Generates a random window id.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
