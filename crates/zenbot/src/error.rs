//! Error types
//!
//! `Display` output of [`CommandError`] is what the user sees in chat, so
//! the messages are written as replies rather than log lines.

use thiserror::Error;

/// Duration text that does not fit the `t?<N>h<N>m<N>s` grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("missing duration")]
    Empty,

    #[error("duration must be longer than zero")]
    Zero,

    #[error("invalid duration \"{0}\"")]
    Invalid(String),

    #[error("duration is too long")]
    Overflow,
}

/// User or channel lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("directory lookup failed: {0}")]
    Backend(String),
}

/// Outbound message delivery failures
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("message sink is closed")]
    Closed,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a `./zen` command, reported back to the channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{0}")]
    Duration(#[from] DurationError),

    #[error("{0}")]
    Resolution(#[from] ResolutionError),
}

/// The transport rejected our credentials; the bot cannot continue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid transport credentials")]
pub struct FatalAuthError;
