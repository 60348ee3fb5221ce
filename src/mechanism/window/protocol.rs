//! Window handshake tokens.
//!
//! | Token | Direction | Meaning |
//! |-------|-----------|---------|
//! | `ispresentation` | receiver → controller | receiver page loaded |
//! | `presentation` | controller → receiver | controller acknowledges |
//! | `channel` | controller → receiver | open a channel |
//! | `channelready` | receiver → controller | channel open |
//! | `receivershutdown` | receiver → controller | receiver terminated |
//!
//! Tokens travel as plain text messages on the same pipe as payloads.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::channel::Message;

// ============================================================================
// ControlToken
// ============================================================================

/// A handshake message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlToken {
    /// Receiver announces itself to its opener.
    IsPresentation,
    /// Controller acknowledges the announcement.
    Presentation,
    /// Controller asks for a channel.
    Channel,
    /// Receiver confirms the channel.
    ChannelReady,
    /// Receiver shut the presentation down.
    ReceiverShutdown,
}

impl ControlToken {
    /// Returns the wire literal.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IsPresentation => "ispresentation",
            Self::Presentation => "presentation",
            Self::Channel => "channel",
            Self::ChannelReady => "channelready",
            Self::ReceiverShutdown => "receivershutdown",
        }
    }

    /// Recognizes a token. Binary messages are never tokens.
    #[must_use]
    pub fn parse(message: &Message) -> Option<Self> {
        match message.as_text()? {
            "ispresentation" => Some(Self::IsPresentation),
            "presentation" => Some(Self::Presentation),
            "channel" => Some(Self::Channel),
            "channelready" => Some(Self::ChannelReady),
            "receivershutdown" => Some(Self::ReceiverShutdown),
            _ => None,
        }
    }

    /// Builds the message carrying this token.
    #[inline]
    #[must_use]
    pub fn to_message(self) -> Message {
        Message::Text(self.as_str().to_string())
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
