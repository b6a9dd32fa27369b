//! Zen session model
//!
//! A [`Session`] is one user's request to be left alone until `ends_at`.
//! The end time is fixed at creation; only the enforcement cooldown moves
//! afterwards, and only forwards.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zen-{}", self.0)
    }
}

/// An active zen period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    /// Chat user who asked for the zen
    pub user_id: String,
    /// Display name, resolved once when the zen was started
    pub display_name: String,
    /// Channel that receives notices about this zen
    pub channel_id: String,
    /// Free-text reason, empty when none was given
    pub reason: String,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Enforcement stays quiet while `now < cooldown_until`
    pub cooldown_until: DateTime<Utc>,
}

impl Session {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        channel_id: impl Into<String>,
        reason: impl Into<String>,
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        cooldown_until: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::next(),
            user_id: user_id.into(),
            display_name: display_name.into(),
            channel_id: channel_id.into(),
            reason: reason.into(),
            started_at,
            ends_at,
            cooldown_until,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        now < self.cooldown_until
    }

    /// Case-insensitive reason match. An empty filter matches everything.
    pub fn reason_matches(&self, filter: &str) -> bool {
        filter.is_empty() || self.reason.to_lowercase() == filter.to_lowercase()
    }

    /// Mention markup understood by the chat transport
    pub fn mention(&self) -> String {
        mention(&self.user_id)
    }
}

pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}
