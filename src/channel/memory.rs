//! In-memory channel pairs.
//!
//! Used by tests, benchmarks and the demo to stand in for a real
//! transport. Delivery is synchronous, so ordering is trivially FIFO.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::{Channel, ChannelSink, Message, WeakChannel};

// ============================================================================
// PipeSink
// ============================================================================

/// Sink that hands messages straight to the other end of the pipe.
struct PipeSink {
    peer: Arc<Mutex<Option<WeakChannel>>>,
}

impl PipeSink {
    fn peer(&self) -> Option<Channel> {
        self.peer.lock().as_ref().and_then(WeakChannel::upgrade)
    }
}

impl ChannelSink for PipeSink {
    fn deliver(&self, message: Message) -> Result<()> {
        let peer = self
            .peer()
            .ok_or_else(|| Error::operation("pipe peer dropped"))?;
        peer.dispatch_message(message);
        Ok(())
    }

    fn close(&self) {
        if let Some(peer) = self.peer() {
            peer.mark_closed();
        }
    }
}

// ============================================================================
// pipe
// ============================================================================

/// Creates two connected channels wired to each other.
///
/// Sending on one dispatches on the other. Closing either end marks the
/// other closed.
#[must_use]
pub fn pipe() -> (Channel, Channel) {
    let left_peer = Arc::new(Mutex::new(None));
    let right_peer = Arc::new(Mutex::new(None));

    let left = Channel::new(PipeSink {
        peer: Arc::clone(&left_peer),
    });
    let right = Channel::new(PipeSink {
        peer: Arc::clone(&right_peer),
    });

    *left_peer.lock() = Some(right.downgrade());
    *right_peer.lock() = Some(left.downgrade());

    (left, right)
}

// ============================================================================
// Tests
// ============================================================================
