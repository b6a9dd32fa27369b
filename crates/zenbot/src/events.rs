//! Inbound events
//!
//! Transports translate whatever they receive into this closed set once, at
//! the edge. The bot never sees transport-specific types.

use std::fmt;

/// User activity the bot watches during a zen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Typing,
    ReactionAdded,
    ReactionRemoved,
    StarAdded,
    StarRemoved,
    PinAdded,
    PinRemoved,
}

impl ActivityKind {
    /// Wording used in violation notices
    pub fn label(&self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::ReactionAdded | Self::ReactionRemoved => "using reactjis",
            Self::StarAdded | Self::StarRemoved => "starring messages",
            Self::PinAdded | Self::PinRemoved => "pinning messages",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A chat message, possibly a `./zen` command
    Message {
        user: String,
        channel: String,
        text: String,
    },
    Activity {
        user: String,
        kind: ActivityKind,
    },
    Connected {
        connection_count: u32,
        info: Option<serde_json::Value>,
    },
    TransportError {
        message: String,
    },
    /// Credentials were rejected
    InvalidAuth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ActivityKind::Typing.label(), "typing");
        assert_eq!(ActivityKind::ReactionRemoved.label(), "using reactjis");
        assert_eq!(ActivityKind::StarAdded.to_string(), "starring messages");
        assert_eq!(ActivityKind::PinRemoved.label(), "pinning messages");
    }
}
