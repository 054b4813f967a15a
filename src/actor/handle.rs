//! Caller-side handles to counter actors.
//!
//! A `CounterHandle` is what `ActorLocator::resolve` returns. It is cheap to
//! clone and survives passivation: when the actor behind it has gone away the
//! handle re-resolves its name and dispatches again.

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use crossbeam::channel::RecvTimeoutError;
use crossbeam::channel::{Receiver, TryRecvError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::ActorLocator;
use super::messages::{Broadcast, CounterMsg, Reply, SubscriberId};
use crate::core::CounterName;
use crate::store::StoreError;

/// Dispatch attempts before a call gives up on a name that keeps passivating.
const DISPATCH_ATTEMPTS: usize = 3;

/// Errors surfaced to callers of a counter operation.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("counter `{0}` is out of range")]
    Overflow(CounterName),

    #[error("actor stopped before replying")]
    ActorStopped,

    #[error("actor passivated")]
    Passivated,

    #[error("service is shutting down")]
    ShuttingDown,
}

/// Address of one named counter.
#[derive(Clone)]
pub struct CounterHandle {
    name: CounterName,
    mailbox: mpsc::Sender<CounterMsg>,
    locator: ActorLocator,
}

impl CounterHandle {
    pub(super) fn new(
        name: CounterName,
        mailbox: mpsc::Sender<CounterMsg>,
        locator: ActorLocator,
    ) -> Self {
        Self {
            name,
            mailbox,
            locator,
        }
    }

    /// Current value, hydrating the actor if needed.
    pub async fn value(&self) -> Result<i64, CounterError> {
        self.call(|reply| CounterMsg::Value { reply }).await
    }

    pub async fn increment(&self) -> Result<i64, CounterError> {
        self.call(|reply| CounterMsg::Increment { reply }).await
    }

    pub async fn decrement(&self) -> Result<i64, CounterError> {
        self.call(|reply| CounterMsg::Decrement { reply }).await
    }

    pub async fn reset(&self) -> Result<i64, CounterError> {
        self.call(|reply| CounterMsg::Reset { reply }).await
    }

    /// Number of live subscribers on this counter.
    pub async fn subscribers(&self) -> Result<usize, CounterError> {
        self.call(|reply| CounterMsg::Subscribers { reply }).await
    }

    /// Join the counter's fan-out set.
    ///
    /// The current value is the first broadcast the subscription yields.
    pub async fn subscribe(&self) -> Result<Subscription, CounterError> {
        let id = self.locator.next_subscriber_id();
        let (outbox, inbox) = crossbeam::channel::bounded(self.locator.subscriber_buffer());

        let (initial, mailbox) = self
            .dispatch(|reply| CounterMsg::Subscribe {
                id,
                outbox: outbox.clone(),
                reply,
            })
            .await?;

        Ok(Subscription {
            id,
            initial,
            inbox,
            mailbox,
        })
    }

    async fn call<T>(&self, make: impl Fn(Reply<T>) -> CounterMsg) -> Result<T, CounterError> {
        self.dispatch(make).await.map(|(value, _)| value)
    }

    /// Send a request and await its reply, following the name to a fresh
    /// instance when the current one is passivating.
    ///
    /// Returns the reply together with the mailbox that produced it.
    async fn dispatch<T>(
        &self,
        make: impl Fn(Reply<T>) -> CounterMsg,
    ) -> Result<(T, mpsc::Sender<CounterMsg>), CounterError> {
        let mut mailbox = self.mailbox.clone();

        for _ in 0..DISPATCH_ATTEMPTS {
            let (reply, response) = oneshot::channel();
            if mailbox.send(make(reply)).await.is_err() {
                mailbox = self.locator.mailbox(&self.name)?;
                continue;
            }

            match response.await {
                Ok(Err(CounterError::Passivated)) => {
                    mailbox = self.locator.mailbox(&self.name)?;
                }
                Ok(result) => return result.map(|value| (value, mailbox)),
                Err(_) => return Err(CounterError::ActorStopped),
            }
        }

        Err(CounterError::ActorStopped)
    }
}

/// A live subscription; dropping it leaves the fan-out set.
pub struct Subscription {
    id: SubscriberId,
    initial: i64,
    inbox: Receiver<Broadcast>,
    mailbox: mpsc::Sender<CounterMsg>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Value at subscribe time.
    pub fn initial(&self) -> i64 {
        self.initial
    }

    /// Next broadcast, if one arrives within `timeout`.
    ///
    /// `Err(Disconnected)` means the actor dropped this subscriber.
    #[cfg(test)]
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Broadcast, RecvTimeoutError> {
        self.inbox.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<Broadcast, TryRecvError> {
        self.inbox.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Actor may already be gone; its set went with it
        let _ = self.mailbox.try_send(CounterMsg::Unsubscribe { id: self.id });
    }
}
