//! Application-facing presentation API.
//!
//! ```text
//! Presentation ──► PresentationRequest ──► Connection   (controller)
//!      │
//!      └────────► PresentationReceiver ──► Connection   (receiver)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `availability` | Display availability flag |
//! | `builder` | [`PresentationBuilder`] |
//! | `connection` | [`Connection`] state machine |
//! | `core` | [`Presentation`] context and discovery |
//! | `receiver` | [`PresentationReceiver`] |
//! | `registry` | [`PresentationRecord`] list |
//! | `request` | [`PresentationRequest`] and `start()` |
//! | `selector` | [`DisplaySelector`] |

// ============================================================================
// Submodules
// ============================================================================

/// Display availability.
pub mod availability;

/// Presentation context builder.
pub mod builder;

/// Presentation connection.
pub mod connection;

/// Presentation context.
pub mod core;

/// Receiver-side registry.
pub mod receiver;

/// Presentation records.
pub mod registry;

/// Controller-side session setup.
pub mod request;

/// Display selection.
pub mod selector;

// ============================================================================
// Re-exports
// ============================================================================

pub use availability::Availability;
pub use builder::PresentationBuilder;
pub use connection::{Connection, ConnectionState, ConnectionStateHandler};
pub use self::core::Presentation;
pub use receiver::PresentationReceiver;
pub use registry::PresentationRecord;
pub use request::{PresentationRequest, RequestState};
pub use selector::{DisplayOption, DisplaySelector, FirstDisplay, SelectorFn};
