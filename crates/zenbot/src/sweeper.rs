//! Expiration sweeper
//!
//! One background loop retires zens whose end time has passed. A pass runs
//! to completion (removal and every notice) before the next wait starts, so
//! passes never overlap. A zen may outlive `ends_at` by up to one interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::ports::NotificationSink;
use crate::registry::SessionRegistry;
use crate::session::Session;

pub struct ExpirationSweeper {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(
        registry: Arc<SessionRegistry>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            clock,
            interval,
        }
    }

    /// One sweep: remove every expired zen and announce each.
    ///
    /// Returns the removed sessions. Delivery failures are logged; the zen
    /// is gone either way.
    pub async fn sweep_once(&self) -> Vec<Session> {
        let expired = self.registry.sweep_expired(self.clock.now());

        for session in &expired {
            info!("Zen {} of {} has ended", session.id, session.display_name);
            let text = ended_message(&session.mention(), &session.reason);
            if let Err(e) = self.sink.send(&text, &session.channel_id).await {
                warn!(
                    "Failed to deliver end-of-zen notice to {}: {}",
                    session.channel_id, e
                );
            }
        }

        expired
    }

    /// Sweep every `interval` until `shutdown` flips to true or its sender
    /// goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        debug!("Sweeper started, interval {:?}", self.interval);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.sweep_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Sweeper stopped");
    }
}

pub fn ended_message(mention: &str, reason: &str) -> String {
    format!("{}: Be free, for your zen ({}) has ended!", mention, reason)
}
