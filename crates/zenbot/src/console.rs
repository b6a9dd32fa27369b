//! Console transport
//!
//! Runs the bot over stdio: one JSON event per line on stdin, one JSON
//! message per line on stdout. The event names follow the usual chat RTM
//! vocabulary:
//!
//! ```text
//! {"type":"message","user":"U1","channel":"C1","text":"./zen 1h focus"}
//! {"type":"user_typing","user":"U1"}
//! {"type":"reaction_added","user":"U1"}
//! ```
//!
//! User and channel names come from the configuration file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::error::{DeliveryError, ResolutionError};
use crate::events::{ActivityKind, InboundEvent};
use crate::ports::{ChannelDirectory, NotificationSink, UserDirectory};

/// Wire form of an inbound event
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Message {
        user: String,
        channel: String,
        #[serde(default)]
        text: String,
    },
    UserTyping {
        user: String,
    },
    ReactionAdded {
        user: String,
    },
    ReactionRemoved {
        user: String,
    },
    StarAdded {
        user: String,
    },
    StarRemoved {
        user: String,
    },
    PinAdded {
        user: String,
    },
    PinRemoved {
        user: String,
    },
    Connected {
        #[serde(default)]
        connection_count: u32,
        #[serde(default)]
        info: Option<serde_json::Value>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    InvalidAuth,
    #[serde(other)]
    Unknown,
}

impl WireEvent {
    fn into_inbound(self) -> Option<InboundEvent> {
        let activity = |user: String, kind| Some(InboundEvent::Activity { user, kind });

        match self {
            Self::Message {
                user,
                channel,
                text,
            } => Some(InboundEvent::Message {
                user,
                channel,
                text,
            }),
            Self::UserTyping { user } => activity(user, ActivityKind::Typing),
            Self::ReactionAdded { user } => activity(user, ActivityKind::ReactionAdded),
            Self::ReactionRemoved { user } => activity(user, ActivityKind::ReactionRemoved),
            Self::StarAdded { user } => activity(user, ActivityKind::StarAdded),
            Self::StarRemoved { user } => activity(user, ActivityKind::StarRemoved),
            Self::PinAdded { user } => activity(user, ActivityKind::PinAdded),
            Self::PinRemoved { user } => activity(user, ActivityKind::PinRemoved),
            Self::Connected {
                connection_count,
                info,
            } => Some(InboundEvent::Connected {
                connection_count,
                info,
            }),
            Self::Error { message } => Some(InboundEvent::TransportError { message }),
            Self::InvalidAuth => Some(InboundEvent::InvalidAuth),
            Self::Unknown => None,
        }
    }
}

/// Decode one line. `Ok(None)` for blank lines and event types we ignore.
pub fn decode_event(line: &str) -> Result<Option<InboundEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let wire: WireEvent = serde_json::from_str(line)?;
    Ok(wire.into_inbound())
}

/// Read events line by line and forward them until EOF or until the
/// receiving side goes away. Malformed lines are logged and skipped.
pub async fn read_events<R>(reader: R, events: mpsc::Sender<InboundEvent>) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        match decode_event(&line) {
            Ok(Some(event)) => {
                if events.send(event).await.is_err() {
                    debug!("Event receiver closed, stopping reader");
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping malformed event: {}", e),
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct Outgoing<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Writes outbound messages as JSON lines
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> NotificationSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, text: &str, channel_id: &str) -> Result<(), DeliveryError> {
        let mut line = serde_json::to_vec(&Outgoing {
            channel: channel_id,
            text,
        })?;
        line.push(b'\n');

        // one writer at a time keeps lines from interleaving
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// User and channel names from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: BTreeMap<String, String>,
    channels: BTreeMap<String, String>,
}

impl StaticDirectory {
    pub fn new(users: BTreeMap<String, String>, channels: BTreeMap<String, String>) -> Self {
        Self { users, channels }
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn resolve_user(&self, user_id: &str) -> Result<String, ResolutionError> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ResolutionError::UserNotFound(user_id.to_string()))
    }
}

#[async_trait]
impl ChannelDirectory for StaticDirectory {
    async fn resolve_channel(&self, channel_id: &str) -> Result<String, ResolutionError> {
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| ResolutionError::ChannelNotFound(channel_id.to_string()))
    }
}
