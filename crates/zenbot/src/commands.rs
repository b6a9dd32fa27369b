//! `./zen` commands
//!
//! Recognises the two command forms in message text and turns them into
//! registry operations with chat replies:
//!
//! - `./zen <duration> [reason]` starts a zen
//! - `./zen cancel [reason]` cancels the sender's zens, optionally only
//!   those with a matching reason

use chrono::{DateTime, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::clock::Clock;
use crate::duration;
use crate::error::{CommandError, DurationError};
use crate::ports::UserDirectory;
use crate::registry::SessionRegistry;
use crate::session::{mention, Session};

pub const START_USAGE: &str = "Usage: `./zen <duration e.g. 1h30m> [reason - optional]`";

static ZEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\./zen").expect("zen regex is valid"));

static ZEN_ARGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\./zen +(t?(?:\d+h(?:\d+m)?(?:\d+s)?|\d+m(?:\d+s)?|\d+s))(?:\s+(.*))?$")
        .expect("zen args regex is valid")
});

static CANCEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\./zen cancel(?:\s+(.*))?$").expect("cancel regex is valid")
});

/// A recognised command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZenCommand {
    Start {
        duration_text: String,
        reason: String,
    },
    Cancel {
        reason: Option<String>,
    },
    /// Looked like `./zen ...` but did not parse
    Usage(&'static str),
}

impl ZenCommand {
    /// Parse message text. `None` means the message is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        if let Some(caps) = CANCEL.captures(text) {
            let reason = caps
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .filter(|r| !r.is_empty());
            return Some(ZenCommand::Cancel { reason });
        }

        if !ZEN.is_match(text) {
            return None;
        }

        match ZEN_ARGS.captures(text) {
            Some(caps) => Some(ZenCommand::Start {
                duration_text: caps[1].to_string(),
                reason: caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            }),
            None => Some(ZenCommand::Usage(START_USAGE)),
        }
    }
}

/// Reply data for a started zen
#[derive(Debug, Clone)]
pub struct StartAck {
    pub session: Session,
    pub duration: Duration,
    pub message: String,
}

/// Result of a cancel request
#[derive(Debug, Clone, Default)]
pub struct CancelOutcome {
    pub cancelled: Vec<Session>,
    /// One acknowledgment per cancelled zen
    pub messages: Vec<String>,
    /// Count summary, present when anything was cancelled
    pub summary: Option<String>,
    /// Reply when nothing matched
    pub none_message: Option<String>,
}

impl CancelOutcome {
    pub fn count(&self) -> usize {
        self.cancelled.len()
    }

    /// Replies in the order they go out: the acknowledgments as one message,
    /// then the summary
    pub fn replies(&self) -> Vec<String> {
        if let Some(none) = &self.none_message {
            return vec![none.clone()];
        }

        let mut replies = vec![self.messages.join("\n")];
        replies.extend(self.summary.clone());
        replies
    }
}

/// Turns start/cancel requests into registry operations
pub struct SessionCommandHandler {
    registry: Arc<SessionRegistry>,
    users: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    initial_grace: TimeDelta,
}

impl SessionCommandHandler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        users: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        initial_grace: Duration,
    ) -> Self {
        Self {
            registry,
            users,
            clock,
            initial_grace: TimeDelta::from_std(initial_grace).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Start a zen for `user_id`, announced in `channel_id`
    pub async fn start_session(
        &self,
        user_id: &str,
        channel_id: &str,
        duration_text: &str,
        reason: &str,
    ) -> Result<StartAck, CommandError> {
        let duration = duration::parse(duration_text)?;

        let display_name = self.users.resolve_user(user_id).await.map_err(|e| {
            error!("Could not resolve user {}: {}", user_id, e);
            e
        })?;

        let now = self.clock.now();
        let ends_at = add(now, duration)?;
        let cooldown_until = now
            .checked_add_signed(self.initial_grace)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let session = Session::new(
            user_id,
            display_name,
            channel_id,
            reason.trim(),
            now,
            ends_at,
            cooldown_until,
        );
        let message = format!(
            "Added a zen for {} ({}), ends at [{}].",
            zenbot_core::format::duration(duration),
            session.reason,
            zenbot_core::format::timestamp(ends_at)
        );

        info!(
            "Zen {} started by {} until {}",
            session.id, session.display_name, ends_at
        );
        self.registry.create(session.clone());

        Ok(StartAck {
            session,
            duration,
            message,
        })
    }

    /// Cancel the user's zens, all of them or those matching `reason`
    pub fn cancel_session(&self, user_id: &str, reason: Option<&str>) -> CancelOutcome {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let cancelled = self.registry.cancel(user_id, reason);

        if cancelled.is_empty() {
            let none = if reason.is_some() {
                "you do not have any such running zens"
            } else {
                "you do not have any running zens"
            };
            return CancelOutcome {
                none_message: Some(none.to_string()),
                ..Default::default()
            };
        }

        info!("Cancelled {} zen(s) of {}", cancelled.len(), user_id);

        let messages = cancelled
            .iter()
            .map(|s| format!("({}) zen canceled.", s.reason))
            .collect();
        let summary = format!(
            "{}-{} for canceling {} zens.",
            mention(user_id),
            "-".repeat(cancelled.len()),
            cancelled.len()
        );

        CancelOutcome {
            cancelled,
            messages,
            summary: Some(summary),
            none_message: None,
        }
    }
}

fn add(now: DateTime<Utc>, duration: Duration) -> Result<DateTime<Utc>, DurationError> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(DurationError::Overflow)
}
