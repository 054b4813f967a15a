use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;

use super::*;
use crate::core::CounterName;
use crate::store::{
    DurableStore, FileStore, MemoryStore, Namespace, NamespaceDoc, SharedStore, StoreError,
};

const WAIT: Duration = Duration::from_secs(2);

fn settings() -> ActorSettings {
    ActorSettings {
        mailbox: 16,
        subscriber_buffer: 16,
        idle_timeout: None,
    }
}

fn locator(store: SharedStore) -> ActorLocator {
    ActorLocator::new(store, settings())
}

fn memory() -> SharedStore {
    Arc::new(MemoryStore::new())
}

fn name(s: &str) -> CounterName {
    CounterName::new(s)
}

/// Memory store whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl DurableStore for FlakyStore {
    fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(ns, key)
    }

    fn put(&self, ns: &Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write refused".into()));
        }
        self.inner.put(ns, key, value)
    }

    fn documents(&self) -> Result<Vec<NamespaceDoc>, StoreError> {
        self.inner.documents()
    }
}

/// Memory store that holds every write to one counter until released.
struct GatedStore {
    inner: MemoryStore,
    gated: CounterName,
    entered: AtomicBool,
    release: crossbeam::channel::Receiver<()>,
}

impl DurableStore for GatedStore {
    fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(ns, key)
    }

    fn put(&self, ns: &Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        if ns.name() == &self.gated {
            self.entered.store(true, Ordering::SeqCst);
            let _ = self.release.recv_timeout(WAIT);
        }
        self.inner.put(ns, key, value)
    }

    fn documents(&self) -> Result<Vec<NamespaceDoc>, StoreError> {
        self.inner.documents()
    }
}

#[tokio::test]
async fn test_counter_sequence() {
    let counter = locator(memory()).resolve(&name("test")).unwrap();

    assert_eq!(counter.value().await.unwrap(), 0);
    assert_eq!(counter.increment().await.unwrap(), 1);
    assert_eq!(counter.increment().await.unwrap(), 2);
    assert_eq!(counter.decrement().await.unwrap(), 1);
    assert_eq!(counter.reset().await.unwrap(), 0);
    assert_eq!(counter.value().await.unwrap(), 0);
}

#[tokio::test]
async fn test_decrement_goes_negative() {
    let counter = locator(memory()).resolve(&name("neg")).unwrap();
    assert_eq!(counter.decrement().await.unwrap(), -1);
    assert_eq!(counter.decrement().await.unwrap(), -2);
}

#[tokio::test]
async fn test_same_name_same_instance() {
    let locator = locator(memory());
    let a = locator.resolve(&name("shared")).unwrap();
    let b = locator.resolve(&name("shared")).unwrap();
    let other = locator.resolve(&name("other")).unwrap();

    a.increment().await.unwrap();
    assert_eq!(b.value().await.unwrap(), 1);
    assert_eq!(other.value().await.unwrap(), 0);
    assert_eq!(locator.active(), vec![name("other"), name("shared")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_are_not_lost() {
    let locator = locator(memory());
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let counter = locator.resolve(&name("race")).unwrap();
        tasks.push(tokio::spawn(async move {
            for _ in 0..25 {
                counter.increment().await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let counter = locator.resolve(&name("race")).unwrap();
    assert_eq!(counter.value().await.unwrap(), 200);
}

#[tokio::test]
async fn test_subscribe_receives_current_value() {
    let locator = locator(memory());
    let counter = locator.resolve(&name("sub")).unwrap();
    counter.increment().await.unwrap();
    counter.increment().await.unwrap();

    let sub = counter.subscribe().await.unwrap();
    assert_eq!(sub.initial(), 2);
    assert_eq!(sub.recv_timeout(WAIT).unwrap(), Broadcast::new(2));
}

#[tokio::test]
async fn test_two_subscribers_see_every_mutation_in_order() {
    let counter = locator(memory()).resolve(&name("fanout")).unwrap();
    let a = counter.subscribe().await.unwrap();
    let b = counter.subscribe().await.unwrap();

    for _ in 0..3 {
        counter.increment().await.unwrap();
    }

    for sub in [&a, &b] {
        let seen: Vec<i64> = (0..4).map(|_| sub.recv_timeout(WAIT).unwrap().count).collect();
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(sub.try_recv().is_err());
    }
}

#[tokio::test]
async fn test_dropped_subscriber_does_not_fail_mutation() {
    let counter = locator(memory()).resolve(&name("leave")).unwrap();
    let a = counter.subscribe().await.unwrap();
    let b = counter.subscribe().await.unwrap();
    assert_eq!(counter.subscribers().await.unwrap(), 2);

    drop(a);
    assert_eq!(counter.increment().await.unwrap(), 1);
    assert_eq!(counter.subscribers().await.unwrap(), 1);
    assert_eq!(b.recv_timeout(WAIT).unwrap().count, 0);
    assert_eq!(b.recv_timeout(WAIT).unwrap().count, 1);
}

#[tokio::test]
async fn test_restart_recovers_value() {
    let store = memory();

    let first = locator(Arc::clone(&store));
    let counter = first.resolve(&name("persist")).unwrap();
    for _ in 0..5 {
        counter.increment().await.unwrap();
    }
    first.shutdown().await;

    let second = locator(store);
    let counter = second.resolve(&name("persist")).unwrap();
    assert_eq!(counter.value().await.unwrap(), 5);
}

#[tokio::test]
async fn test_restart_recovers_value_from_disk() {
    let dir = TempDir::new().unwrap();

    {
        let store: SharedStore = Arc::new(FileStore::open(dir.path()).unwrap());
        let locator = locator(store);
        let counter = locator.resolve(&name("persist")).unwrap();
        for _ in 0..5 {
            counter.increment().await.unwrap();
        }
        locator.shutdown().await;
    }

    let store: SharedStore = Arc::new(FileStore::open(dir.path()).unwrap());
    let counter = locator(store).resolve(&name("persist")).unwrap();
    assert_eq!(counter.value().await.unwrap(), 5);
}

#[tokio::test]
async fn test_failed_write_keeps_old_value() {
    let store = Arc::new(FlakyStore::default());
    let counter = locator(store.clone()).resolve(&name("flaky")).unwrap();
    let sub = counter.subscribe().await.unwrap();
    counter.increment().await.unwrap();

    store.fail_writes.store(true, Ordering::SeqCst);
    let err = counter.increment().await.unwrap_err();
    assert!(matches!(err, CounterError::Store(_)));
    assert!(counter.reset().await.is_err());
    assert_eq!(counter.value().await.unwrap(), 1);

    store.fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(counter.increment().await.unwrap(), 2);

    // No broadcast for the failed writes
    let seen: Vec<i64> = (0..3).map(|_| sub.recv_timeout(WAIT).unwrap().count).collect();
    assert_eq!(seen, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_passivation_then_reactivation() {
    let store = memory();
    let locator = ActorLocator::new(
        store,
        ActorSettings {
            idle_timeout: Some(Duration::from_millis(50)),
            ..settings()
        },
    );

    let counter = locator.resolve(&name("idle")).unwrap();
    assert_eq!(counter.increment().await.unwrap(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(locator.active().is_empty());

    // Same handle follows the name to the new instance
    assert_eq!(counter.increment().await.unwrap(), 2);
    assert_eq!(locator.active(), vec![name("idle")]);
}

#[tokio::test]
async fn test_subscriber_keeps_actor_alive() {
    let locator = ActorLocator::new(
        memory(),
        ActorSettings {
            idle_timeout: Some(Duration::from_millis(50)),
            ..settings()
        },
    );

    let counter = locator.resolve(&name("watched")).unwrap();
    let sub = counter.subscribe().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(locator.active(), vec![name("watched")]);

    counter.increment().await.unwrap();
    assert_eq!(sub.recv_timeout(WAIT).unwrap().count, 0);
    assert_eq!(sub.recv_timeout(WAIT).unwrap().count, 1);
}

#[tokio::test]
async fn test_shutdown_rejects_new_calls() {
    let locator = locator(memory());
    let counter = locator.resolve(&name("bye")).unwrap();
    let sub = counter.subscribe().await.unwrap();
    counter.increment().await.unwrap();

    locator.shutdown().await;

    assert!(matches!(
        locator.resolve(&name("bye")),
        Err(CounterError::ShuttingDown)
    ));
    assert!(counter.increment().await.is_err());

    // Outbox closed once the actor is gone
    let _ = sub.recv_timeout(WAIT);
    let _ = sub.recv_timeout(WAIT);
    assert!(matches!(
        sub.recv_timeout(WAIT),
        Err(crossbeam::channel::RecvTimeoutError::Disconnected)
    ));
}

#[tokio::test]
async fn test_overflow_is_reported() {
    let store = memory();
    let ns = Namespace::for_counter(&name("max"));
    store.put(&ns, COUNT_KEY, Value::from(i64::MAX)).unwrap();

    let counter = locator(store).resolve(&name("max")).unwrap();
    assert!(matches!(
        counter.increment().await,
        Err(CounterError::Overflow(_))
    ));
    assert_eq!(counter.value().await.unwrap(), i64::MAX);
}

#[tokio::test]
async fn test_slow_write_does_not_stall_other_counters() {
    let (release_tx, release) = crossbeam::channel::bounded(1);
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gated: name("slow"),
        entered: AtomicBool::new(false),
        release,
    });
    let locator = locator(store.clone());

    let started = std::time::Instant::now();
    let slow = locator.resolve(&name("slow")).unwrap();
    let pending = tokio::spawn(async move { slow.increment().await });

    while !store.entered.load(Ordering::SeqCst) {
        tokio::task::yield_now().await;
    }

    // Single-threaded runtime: this only answers if the write is off-thread
    let fast = locator.resolve(&name("fast")).unwrap();
    assert_eq!(fast.increment().await.unwrap(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));

    release_tx.send(()).unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), 1);
}
