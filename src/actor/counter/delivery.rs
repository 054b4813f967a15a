//! Subscriber fan-out.
//!
//! Each subscriber is a bounded outbox drained by its own connection loop.
//! A full or closed outbox means the subscriber is gone or hopelessly behind,
//! so it is removed and the mutation proceeds.

use crossbeam::channel::{Sender, TrySendError};

use super::{CounterActor, Subscriber};
use crate::actor::{Broadcast, CounterError};

impl CounterActor {
    /// Register an outbox and push the current value into it.
    pub(super) async fn subscribe(
        &mut self,
        id: u64,
        outbox: Sender<Broadcast>,
    ) -> Result<i64, CounterError> {
        let count = self.hydrate().await?;

        if outbox.try_send(Broadcast::new(count)).is_err() {
            // Connection already gone
            return Ok(count);
        }

        self.subscribers.push(Subscriber { id, outbox });
        crate::debug!("actor"; "{} +subscriber #{} ({} total)", self.name, id, self.subscribers.len());
        Ok(count)
    }

    pub(super) fn unsubscribe(&mut self, id: u64) {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != id);
        if self.subscribers.len() != before {
            crate::debug!("actor"; "{} -subscriber #{} ({} left)", self.name, id, self.subscribers.len());
        }
    }

    /// Send `count` to every subscriber, dropping the ones that cannot take it.
    pub(super) fn broadcast(&mut self, count: i64) {
        if self.subscribers.is_empty() {
            return;
        }

        let name = &self.name;
        let message = Broadcast::new(count);
        self.subscribers.retain(|sub| match sub.outbox.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                crate::log!("actor"; "{} dropping slow subscriber #{}", name, sub.id);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                crate::debug!("actor"; "{} subscriber #{} disconnected", name, sub.id);
                false
            }
        });
    }
}
