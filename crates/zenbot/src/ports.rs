//! Collaborator interfaces
//!
//! The registry, gate and sweeper never talk to a chat service directly.
//! They go through these traits; the binary plugs in the console adapters
//! and tests plug in recording fakes.

use async_trait::async_trait;

use crate::error::{DeliveryError, ResolutionError};

/// Best-effort outbound message delivery.
///
/// Callers log failures and carry on; a failed send never undoes a
/// registry change.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str, channel_id: &str) -> Result<(), DeliveryError>;
}

/// Resolves user ids to display names
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve_user(&self, user_id: &str) -> Result<String, ResolutionError>;
}

/// Resolves channel ids to channel names (used by the allow-list only)
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn resolve_channel(&self, channel_id: &str) -> Result<String, ResolutionError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A delivered message
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Sent {
        pub channel: String,
        pub text: String,
    }

    /// Sink that remembers everything sent through it
    #[derive(Default)]
    pub struct RecordingSink {
        sent: Mutex<Vec<Sent>>,
        failing: AtomicBool,
        attempts: AtomicUsize,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// A sink whose every send fails
        pub fn failing() -> Self {
            let sink = Self::default();
            sink.failing.store(true, Ordering::SeqCst);
            sink
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn texts(&self) -> Vec<String> {
            self.sent().into_iter().map(|s| s.text).collect()
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, text: &str, channel_id: &str) -> Result<(), DeliveryError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(DeliveryError::Closed);
            }
            self.sent.lock().unwrap().push(Sent {
                channel: channel_id.to_string(),
                text: text.to_string(),
            });
            Ok(())
        }
    }
}
