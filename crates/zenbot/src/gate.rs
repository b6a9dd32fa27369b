//! Enforcement gate
//!
//! Turns activity signals (typing, reacting, starring, pinning) into at most
//! one violation notice per session per cooldown window.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ports::NotificationSink;
use crate::registry::{SessionRegistry, Violation};

pub struct EnforcementGate {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn NotificationSink>,
    cooldown: TimeDelta,
}

impl EnforcementGate {
    pub fn new(
        registry: Arc<SessionRegistry>,
        sink: Arc<dyn NotificationSink>,
        cooldown: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Report that `user_id` did `activity` at `now`.
    ///
    /// Returns the violation when a notice was due. The cooldown is claimed
    /// in the registry before the notice goes out, so a failed send still
    /// counts against the window.
    pub async fn report_activity(
        &self,
        user_id: &str,
        activity: &str,
        now: DateTime<Utc>,
    ) -> Option<Violation> {
        let Some(violation) = self.registry.try_enforce(user_id, now, self.cooldown) else {
            debug!("No enforcement due for {} ({})", user_id, activity);
            return None;
        };

        let session = &violation.session;
        info!(
            "Zen violation by {} ({}): {}",
            session.display_name, session.id, activity
        );

        let text = violation_message(&session.mention(), activity, &session.reason);
        if let Err(e) = self.sink.send(&text, &session.channel_id).await {
            warn!(
                "Failed to deliver violation notice to {}: {}",
                session.channel_id, e
            );
        }

        Some(violation)
    }
}

pub fn violation_message(mention: &str, activity: &str, reason: &str) -> String {
    format!(
        "{}-- for {} during your zen period ({}).",
        mention, activity, reason
    )
}
