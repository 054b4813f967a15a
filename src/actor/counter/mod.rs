//! Counter Actor - one named counter, one task
//!
//! This actor is responsible for:
//! - Hydrating the counter from its store namespace on first use
//! - Applying mutations one at a time, write-through
//! - Broadcasting every committed value to its subscribers
//! - Passivating when idle with nobody listening
//!
//! # Lifecycle
//!
//! ```text
//! spawn --> Active(Unloaded) --first call--> Active(Loaded)
//!                                               |
//!                      idle, no subscribers     v
//!           (exit) <--drain queue-- Passivating
//! ```

mod delivery;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::error::Elapsed;

use super::CounterError;
use super::messages::CounterMsg;
use crate::core::CounterName;
use crate::store::{Storage, StoreError};

/// The single persisted key of a counter namespace.
pub const COUNT_KEY: &str = "count";

/// Whether the in-memory value has been read from the store yet.
///
/// `Unloaded` reads the store before answering; `Loaded` never reads it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    Unloaded,
    Loaded(i64),
}

/// A subscriber's outbox, drained by its connection loop.
struct Subscriber {
    id: u64,
    outbox: crossbeam::channel::Sender<super::Broadcast>,
}

/// Why the actor stops accepting new messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closing {
    /// Idle timeout with no subscribers
    Passivate,
    /// Locator shutdown
    Shutdown,
}

/// Counter Actor - owns one counter's value and subscriber set
pub struct CounterActor {
    name: CounterName,
    /// Channel to receive messages
    rx: mpsc::Receiver<CounterMsg>,
    storage: Storage,
    state: Hydration,
    subscribers: Vec<Subscriber>,
    idle_timeout: Option<Duration>,
}

impl CounterActor {
    /// Create a new CounterActor
    pub fn new(
        name: CounterName,
        rx: mpsc::Receiver<CounterMsg>,
        storage: Storage,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            name,
            rx,
            storage,
            state: Hydration::Unloaded,
            subscribers: Vec::new(),
            idle_timeout,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        crate::debug!("actor"; "{} ({}) active", self.name, self.storage.namespace().id());

        let closing = loop {
            match self.next_message().await {
                Ok(Some(CounterMsg::Shutdown)) => break Closing::Shutdown,
                Ok(Some(msg)) => self.handle(msg).await,
                // Every handle dropped; nobody can reach us again
                Ok(None) => break Closing::Shutdown,
                Err(_) => break Closing::Passivate,
            }
        };

        self.close(closing).await;
    }

    /// Wait for the next message.
    ///
    /// Times out only while passivation is enabled and nobody is subscribed.
    async fn next_message(&mut self) -> Result<Option<CounterMsg>, Elapsed> {
        match self.idle_timeout {
            Some(timeout) if self.subscribers.is_empty() => {
                tokio::time::timeout(timeout, self.rx.recv()).await
            }
            _ => Ok(self.rx.recv().await),
        }
    }

    /// Stop accepting messages, finish the ones already queued, exit.
    async fn close(&mut self, closing: Closing) {
        self.rx.close();

        while let Some(msg) = self.rx.recv().await {
            match msg {
                CounterMsg::Subscribe { reply, .. } => {
                    // Caller retries against the next instance
                    let err = match closing {
                        Closing::Passivate => CounterError::Passivated,
                        Closing::Shutdown => CounterError::ShuttingDown,
                    };
                    let _ = reply.send(Err(err));
                }
                CounterMsg::Shutdown => {}
                msg => self.handle(msg).await,
            }
        }

        match closing {
            Closing::Passivate => {
                crate::debug!("actor"; "{} passivated", self.name);
            }
            Closing::Shutdown => {
                if !self.subscribers.is_empty() {
                    crate::debug!("actor"; "{} dropping {} subscribers", self.name, self.subscribers.len());
                }
                self.subscribers.clear();
                crate::debug!("actor"; "{} stopped", self.name);
            }
        }
    }

    async fn handle(&mut self, msg: CounterMsg) {
        match msg {
            CounterMsg::Value { reply } => {
                let _ = reply.send(self.hydrate().await);
            }
            CounterMsg::Increment { reply } => {
                let _ = reply.send(self.apply(|count| count.checked_add(1)).await);
            }
            CounterMsg::Decrement { reply } => {
                let _ = reply.send(self.apply(|count| count.checked_sub(1)).await);
            }
            CounterMsg::Reset { reply } => {
                let _ = reply.send(self.commit(0).await);
            }
            CounterMsg::Subscribe { id, outbox, reply } => {
                let _ = reply.send(self.subscribe(id, outbox).await);
            }
            CounterMsg::Unsubscribe { id } => {
                self.unsubscribe(id);
            }
            CounterMsg::Subscribers { reply } => {
                let _ = reply.send(Ok(self.subscribers.len()));
            }
            CounterMsg::Shutdown => {}
        }
    }

    /// Current value, reading the store on first access.
    async fn hydrate(&mut self) -> Result<i64, CounterError> {
        if let Hydration::Loaded(count) = self.state {
            return Ok(count);
        }
        let count = self
            .with_storage(|storage| storage.get::<i64>(COUNT_KEY))
            .await?
            .unwrap_or(0);
        crate::debug!("actor"; "{} hydrated at {}", self.name, count);
        self.state = Hydration::Loaded(count);
        Ok(count)
    }

    /// Hydrate, compute the next value, commit it.
    async fn apply(&mut self, step: impl FnOnce(i64) -> Option<i64>) -> Result<i64, CounterError> {
        let current = self.hydrate().await?;
        let next = step(current).ok_or_else(|| CounterError::Overflow(self.name.clone()))?;
        self.commit(next).await
    }

    /// Persist `next`, then adopt it and tell subscribers.
    ///
    /// The in-memory value only changes after the store accepted the write.
    async fn commit(&mut self, next: i64) -> Result<i64, CounterError> {
        self.with_storage(move |storage| storage.put(COUNT_KEY, &next))
            .await?;
        self.state = Hydration::Loaded(next);
        self.broadcast(next);
        Ok(next)
    }

    /// Run one store call on the blocking pool.
    ///
    /// The actor awaits it before taking the next message, so store access
    /// stays one at a time per counter.
    async fn with_storage<T, F>(&self, op: F) -> Result<T, CounterError>
    where
        T: Send + 'static,
        F: FnOnce(&Storage) -> Result<T, StoreError> + Send + 'static,
    {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || op(&storage))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .map_err(CounterError::from)
    }

    #[cfg(test)]
    pub(super) fn state(&self) -> Hydration {
        self.state
    }
}
