//! Channel allow-list
//!
//! Commands are only honoured in allow-listed channels. The list holds
//! channel names, so ids are resolved through the [`ChannelDirectory`] and
//! cached.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use crate::error::ResolutionError;
use crate::ports::ChannelDirectory;

pub struct ChannelAllowList {
    allowed: BTreeSet<String>,
    directory: Arc<dyn ChannelDirectory>,
    names: RwLock<HashMap<String, String>>,
}

impl ChannelAllowList {
    /// An empty `allowed` set permits every channel
    pub fn new(allowed: BTreeSet<String>, directory: Arc<dyn ChannelDirectory>) -> Self {
        Self {
            allowed,
            directory,
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Whether commands may be used in `channel_id`. Lookup failures deny.
    pub async fn permits(&self, channel_id: &str) -> bool {
        if self.is_open() {
            return true;
        }

        let name = match self.channel_name(channel_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Could not look up channel name for {}: {}", channel_id, e);
                return false;
            }
        };

        let allowed = self.allowed.contains(&name);
        if !allowed {
            debug!("Channel {} is not allow-listed, command ignored", name);
        }
        allowed
    }

    async fn channel_name(&self, channel_id: &str) -> Result<String, ResolutionError> {
        let cached = self
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel_id)
            .cloned();
        if let Some(name) = cached {
            return Ok(name);
        }

        let name = self.directory.resolve_channel(channel_id).await?;
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel_id.to_string(), name.clone());
        Ok(name)
    }
}
