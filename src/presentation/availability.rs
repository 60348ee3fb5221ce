//! Display availability.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

// ============================================================================
// Availability
// ============================================================================

/// Whether any display was found by the last discovery round.
///
/// Starts `false`. Updated every time `start()` discovers.
#[derive(Debug, Clone)]
pub struct Availability {
    tx: Arc<watch::Sender<bool>>,
}

impl Availability {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns the current value.
    #[inline]
    #[must_use]
    pub fn value(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribes to changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Records the outcome of a discovery round.
    pub(crate) fn update(&self, available: bool) {
        let changed = self.tx.send_if_modified(|value| {
            if *value == available {
                return false;
            }
            *value = available;
            true
        });

        if changed {
            debug!(available, "Display availability changed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
