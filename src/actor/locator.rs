//! Actor Locator - name to live actor instance
//!
//! ```text
//! resolve("a") ──> slots["a"] live? ──yes──> CounterHandle(mailbox)
//!                        │ no (never seen, or passivated)
//!                        v
//!                  spawn CounterActor ──waits on──> lease["a"]
//! ```
//!
//! A passivated actor keeps its lease until its queue is drained, so the
//! next instance for the same name never overlaps the previous one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::counter::CounterActor;
use super::handle::{CounterError, CounterHandle};
use super::messages::CounterMsg;
use crate::config::ActorConfig;
use crate::core::CounterName;
use crate::store::{Namespace, SharedStore, Storage};

/// Per-actor runtime knobs, taken from `[actor]`.
#[derive(Debug, Clone, Copy)]
pub struct ActorSettings {
    pub mailbox: usize,
    pub subscriber_buffer: usize,
    /// `None` keeps actors alive for the process lifetime
    pub idle_timeout: Option<Duration>,
}

impl ActorSettings {
    pub fn from_config(config: &ActorConfig) -> Self {
        Self {
            mailbox: config.mailbox.max(1),
            subscriber_buffer: config.subscriber_buffer.max(1),
            idle_timeout: config.idle_timeout(),
        }
    }
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self::from_config(&ActorConfig::default())
    }
}

/// One name's current instance.
struct Slot {
    mailbox: mpsc::Sender<CounterMsg>,
    /// Held by the running instance
    lease: Arc<Mutex<()>>,
    task: JoinHandle<()>,
}

struct LocatorInner {
    store: SharedStore,
    settings: ActorSettings,
    runtime: Handle,
    slots: DashMap<CounterName, Slot>,
    next_subscriber: AtomicU64,
    closed: AtomicBool,
}

/// Maps counter names to exactly one live actor each.
#[derive(Clone)]
pub struct ActorLocator {
    inner: Arc<LocatorInner>,
}

impl ActorLocator {
    /// Must be called from inside a tokio runtime; actors run on it.
    #[cfg(test)]
    pub fn new(store: SharedStore, settings: ActorSettings) -> Self {
        Self::with_runtime(store, settings, Handle::current())
    }

    pub fn with_runtime(store: SharedStore, settings: ActorSettings, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(LocatorInner {
                store,
                settings,
                runtime,
                slots: DashMap::new(),
                next_subscriber: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Handle to the actor for `name`, activating it if needed.
    pub fn resolve(&self, name: &CounterName) -> Result<CounterHandle, CounterError> {
        let mailbox = self.mailbox(name)?;
        Ok(CounterHandle::new(name.clone(), mailbox, self.clone()))
    }

    /// Names with a live (not passivated) instance, sorted.
    #[cfg(test)]
    pub fn active(&self) -> Vec<CounterName> {
        let mut names: Vec<_> = self
            .inner
            .slots
            .iter()
            .filter(|slot| !slot.mailbox.is_closed())
            .map(|slot| slot.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting calls, let every actor finish its queue, wait for them.
    pub async fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let names: Vec<CounterName> = self.inner.slots.iter().map(|s| s.key().clone()).collect();
        let mut tasks = Vec::with_capacity(names.len());
        for name in names {
            let Some((name, slot)) = self.inner.slots.remove(&name) else {
                continue;
            };
            // Passivated instances have already closed their mailbox
            let _ = slot.mailbox.send(CounterMsg::Shutdown).await;
            tasks.push((name, slot.task));
        }

        let count = tasks.len();
        for (name, task) in tasks {
            if let Err(err) = task.await {
                crate::log!("actor"; "{} did not stop cleanly: {}", name, err);
            }
        }
        crate::debug!("actor"; "stopped {} actors", count);
    }

    /// Current mailbox for `name`, spawning a new instance when there is no
    /// live one.
    pub(super) fn mailbox(
        &self,
        name: &CounterName,
    ) -> Result<mpsc::Sender<CounterMsg>, CounterError> {
        if self.is_closed() {
            return Err(CounterError::ShuttingDown);
        }

        let mut slot = self
            .inner
            .slots
            .entry(name.clone())
            .or_insert_with(|| self.activate(name, Arc::new(Mutex::new(()))));

        if slot.mailbox.is_closed() {
            let lease = Arc::clone(&slot.lease);
            *slot = self.activate(name, lease);
        }

        Ok(slot.mailbox.clone())
    }

    pub(super) fn next_subscriber_id(&self) -> u64 {
        self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn subscriber_buffer(&self) -> usize {
        self.inner.settings.subscriber_buffer
    }

    fn activate(&self, name: &CounterName, lease: Arc<Mutex<()>>) -> Slot {
        let settings = self.inner.settings;
        let (tx, rx) = mpsc::channel(settings.mailbox);
        let storage = Storage::new(Namespace::for_counter(name), Arc::clone(&self.inner.store));
        let actor = CounterActor::new(name.clone(), rx, storage, settings.idle_timeout);

        let task_lease = Arc::clone(&lease);
        let task = self.inner.runtime.spawn(async move {
            let _held = task_lease.lock_owned().await;
            actor.run().await;
        });

        Slot {
            mailbox: tx,
            lease,
            task,
        }
    }
}
