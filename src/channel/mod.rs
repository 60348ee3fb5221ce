//! Bidirectional message channels.
//!
//! A channel is the low-level pipe underneath a connection. Transports
//! create channels; connections own them.
//!
//! # Lifecycle
//!
//! ```text
//!   Channel::new(sink)          close() / mark_closed()
//! ────────────────────► connected ─────────────────────► closed
//! ```
//!
//! A closed channel never reconnects. Re-establishing a transport yields
//! a new [`Channel`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | [`Channel`] state machine and handler slots |
//! | `memory` | In-memory [`pipe`] pairs |
//! | `message` | Opaque [`Message`] payload |

// ============================================================================
// Submodules
// ============================================================================

/// Channel state machine and handler slots.
pub mod core;

/// In-memory channel pairs.
pub mod memory;

/// Opaque channel payload.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Channel, ChannelSink, ChannelState, MessageHandler, StateHandler, WeakChannel};
pub use memory::pipe;
pub use message::Message;
