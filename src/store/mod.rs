//! Durable key-value storage for actors.
//!
//! Every actor owns one namespace (keyed by its `ActorId`) and is the only
//! writer to it. Values are JSON so a namespace can grow more keys later.
//!
//! ```text
//! CounterActor --Storage(ns)--> DurableStore
//!                                 ├── FileStore    (<dir>/<actor-id>.json)
//!                                 └── MemoryStore  (process lifetime)
//! ```

mod file;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};
use crate::core::{ActorId, CounterName};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Store-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("corrupt store document `{0}`")]
    Corrupt(PathBuf, #[source] serde_json::Error),

    #[error("value under `{key}` has an unexpected shape")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The namespace an actor persists into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    id: ActorId,
    name: CounterName,
}

impl Namespace {
    pub fn for_counter(name: &CounterName) -> Self {
        Self {
            id: name.actor_id(),
            name: name.clone(),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &CounterName {
        &self.name
    }
}

/// One persisted namespace, as written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDoc {
    /// Counter name the namespace belongs to (informational)
    pub name: String,
    pub entries: Map<String, Value>,
}

/// Key-value persistence primitive consumed by actors.
///
/// Implementations must make a successful `put` visible to every later `get`,
/// including from a new process over the same backing storage.
pub trait DurableStore: Send + Sync {
    fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Value>, StoreError>;

    fn put(&self, ns: &Namespace, key: &str, value: Value) -> Result<(), StoreError>;

    /// All namespaces currently persisted, sorted by name.
    fn documents(&self) -> Result<Vec<NamespaceDoc>, StoreError>;
}

pub type SharedStore = Arc<dyn DurableStore>;

/// Typed view of a store restricted to one namespace.
#[derive(Clone)]
pub struct Storage {
    ns: Namespace,
    store: SharedStore,
}

impl Storage {
    pub fn new(ns: Namespace, store: SharedStore) -> Self {
        Self { ns, store }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(&self.ns, key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StoreError::Codec {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Codec {
            key: key.to_string(),
            source,
        })?;
        self.store.put(&self.ns, key, value)
    }
}

/// Open the backend selected by `[store]`.
pub fn open(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    match config.backend {
        StoreBackend::File => {
            let store = FileStore::open(&config.dir)?;
            crate::debug!("store"; "file store at {}", config.dir.display());
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            crate::log!("store"; "memory backend: counters reset on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
