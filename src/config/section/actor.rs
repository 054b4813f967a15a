//! `[actor]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [actor]
//! idle_timeout = 300          # Seconds before an idle counter passivates (0 = never)
//! mailbox = 32                # Queued calls per counter
//! subscriber_buffer = 64      # Undelivered broadcasts per subscriber
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Actor runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Seconds without calls before an actor with no subscribers passivates.
    pub idle_timeout: u64,

    /// Capacity of each actor's mailbox.
    pub mailbox: usize,

    /// Broadcasts buffered per subscriber before it is dropped as too slow.
    pub subscriber_buffer: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            idle_timeout: 300,
            mailbox: 32,
            subscriber_buffer: 64,
        }
    }
}

impl ActorConfig {
    /// `None` disables passivation.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.mailbox == 0 {
            diag.error("actor.mailbox", "mailbox capacity must be at least 1");
        }
        if self.subscriber_buffer == 0 {
            diag.error(
                "actor.subscriber_buffer",
                "subscriber buffer must be at least 1",
            );
        }
    }
}
