//! Presentation shim - second-screen sessions over heterogeneous transports.
//!
//! This library lets a controlling context start a message-passing session
//! with a receiving context on a second screen. Discovery, display
//! selection, connection setup, channel lifecycle and reconnection look the
//! same whatever transport carries the messages.
//!
//! # Architecture
//!
//! ```text
//! Presentation ─ request(url) ─► PresentationRequest ─ start() ─► Connection
//!      │                                                              │
//!      │ mechanisms (registration order)                       Peer + Channel
//!      ▼                                                              ▲
//! CastMechanism ── CastPlatform (native SDK)                          │
//! WindowMechanism ─ WindowSystem (host windows) ──────────────────────┘
//! ```
//!
//! - Each [`Mechanism`] finds displays and opens [`Channel`]s to them
//! - A [`Connection`] hides which mechanism it runs over
//! - Channels are created lazily and recreated on `reconnect`
//! - The receiving side uses [`PresentationReceiver`] to accept controllers
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use presentation_shim::{MemoryWindows, Presentation, Result, WindowMechanism};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let windows = MemoryWindows::root();
//!     let presentation = Presentation::builder()
//!         .mechanism(WindowMechanism::new(Arc::new(windows)))
//!         .build()?;
//!
//!     let request = presentation.request("https://slides.example/receiver.html")?;
//!     let connection = request.start().await?;
//!     connection.send("next")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`channel`] | [`Channel`] pipes and [`Message`] payloads |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`mechanism`] | Transports: cast and attached window |
//! | [`presentation`] | Application API: requests, connections, receiver |

// ============================================================================
// Modules
// ============================================================================

/// Bidirectional message channels.
pub mod channel;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Transport mechanisms.
///
/// Implement [`Mechanism`] to add a transport.
pub mod mechanism;

/// Application-facing presentation API.
///
/// Use [`Presentation::builder()`] to create a context.
pub mod presentation;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{Channel, ChannelState, Message, pipe};

// Error types
pub use error::{Error, ErrorKind, Result};

// Identifier types
pub use identifiers::{ChannelId, PresentationId, WindowId};

// Mechanism types
pub use mechanism::cast::{CastMechanism, CastOptions};
pub use mechanism::window::{MemoryWindows, WindowMechanism, WindowOptions};
pub use mechanism::{Display, Mechanism, Peer, PeerHandle, RemoteController};

// Presentation types
pub use presentation::{
    Availability, Connection, ConnectionState, DisplayOption, DisplaySelector, FirstDisplay,
    Presentation, PresentationBuilder, PresentationReceiver, PresentationRecord,
    PresentationRequest, RequestState, SelectorFn,
};
