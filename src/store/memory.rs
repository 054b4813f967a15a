//! In-memory store, lives as long as the process.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::{DurableStore, Namespace, NamespaceDoc, StoreError};
use crate::core::ActorId;

#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<FxHashMap<ActorId, NamespaceDoc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .docs
            .read()
            .get(&ns.id())
            .and_then(|doc| doc.entries.get(key).cloned()))
    }

    fn put(&self, ns: &Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        let mut docs = self.docs.write();
        let doc = docs.entry(ns.id()).or_insert_with(|| NamespaceDoc {
            name: ns.name().to_string(),
            entries: Default::default(),
        });
        doc.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn documents(&self) -> Result<Vec<NamespaceDoc>, StoreError> {
        let mut docs: Vec<_> = self.docs.read().values().cloned().collect();
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CounterName;

    #[test]
    fn test_memory_put_get() {
        let store = MemoryStore::new();
        let ns = Namespace::for_counter(&CounterName::new("a"));

        assert_eq!(store.get(&ns, "count").unwrap(), None);
        store.put(&ns, "count", Value::from(7)).unwrap();
        assert_eq!(store.get(&ns, "count").unwrap(), Some(Value::from(7)));

        let docs = store.documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "a");
    }
}
