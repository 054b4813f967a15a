//! Actor Message Definitions
//!
//! ```text
//! CounterHandle --CounterMsg--> CounterActor --Broadcast--> Subscription outboxes
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::CounterError;

/// Reply channel carried by every request message.
pub type Reply<T> = oneshot::Sender<Result<T, CounterError>>;

/// Process-unique id of one subscriber connection.
pub type SubscriberId = u64;

// =============================================================================
// CounterActor Messages
// =============================================================================

/// Messages to a Counter Actor
#[derive(Debug)]
pub enum CounterMsg {
    /// Current value (hydrates on first access)
    Value { reply: Reply<i64> },
    /// Add one, persist, broadcast
    Increment { reply: Reply<i64> },
    /// Subtract one, persist, broadcast (no floor)
    Decrement { reply: Reply<i64> },
    /// Set to zero, persist, broadcast
    Reset { reply: Reply<i64> },
    /// Join the fan-out set; the current value is pushed to `outbox` first
    Subscribe {
        id: SubscriberId,
        outbox: crossbeam::channel::Sender<Broadcast>,
        reply: Reply<i64>,
    },
    /// Leave the fan-out set (connection closed)
    Unsubscribe { id: SubscriberId },
    /// Number of live subscribers
    Subscribers { reply: Reply<usize> },
    /// Finish queued work, drop subscribers, exit
    Shutdown,
}

// =============================================================================
// Broadcast
// =============================================================================

/// State pushed to every subscriber after each mutation.
///
/// Wire form: `{"count": <integer>}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub count: i64,
}

impl Broadcast {
    pub fn new(count: i64) -> Self {
        Self { count }
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "count": self.count }).to_string()
    }

    pub fn from_json(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_wire_shape() {
        assert_eq!(Broadcast::new(-4).to_json(), r#"{"count":-4}"#);
    }

    #[test]
    fn test_broadcast_parse() {
        assert_eq!(Broadcast::from_json(r#"{"count": 12}"#), Some(Broadcast::new(12)));
        assert_eq!(Broadcast::from_json(r#"{"count": "12"}"#), None);
        assert_eq!(Broadcast::from_json("subscribe"), None);
    }
}
