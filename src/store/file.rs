//! File-backed store: one JSON document per namespace.
//!
//! Writes go to a temp file that is synced and renamed over the document, so a
//! crash leaves either the old or the new value on disk, never a torn one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{DurableStore, Namespace, NamespaceDoc, StoreError};

/// Document file extension
const DOC_EXT: &str = "json";

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|e| StoreError::Io(dir.to_path_buf(), e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn doc_path(&self, ns: &Namespace) -> PathBuf {
        self.dir.join(format!("{}.{DOC_EXT}", ns.id().to_hex()))
    }

    fn read_doc(path: &Path) -> Result<Option<NamespaceDoc>, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(path.to_path_buf(), e)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(path.to_path_buf(), e))
    }

    fn write_doc(path: &Path, doc: &NamespaceDoc) -> Result<(), StoreError> {
        let json =
            serde_json::to_string_pretty(doc).map_err(|e| StoreError::Corrupt(path.to_path_buf(), e))?;

        let tmp = path.with_extension("json.tmp");
        let io_err = |e| StoreError::Io(tmp.clone(), e);

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, path).map_err(|e| StoreError::Io(path.to_path_buf(), e))
    }
}

impl DurableStore for FileStore {
    fn get(&self, ns: &Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        let doc = Self::read_doc(&self.doc_path(ns))?;
        Ok(doc.and_then(|mut doc| doc.entries.remove(key)))
    }

    fn put(&self, ns: &Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.doc_path(ns);
        let mut doc = Self::read_doc(&path)?.unwrap_or_default();
        doc.name = ns.name().to_string();
        doc.entries.insert(key.to_string(), value);
        Self::write_doc(&path, &doc)?;
        crate::debug!("store"; "{} <- {}", ns.id(), key);
        Ok(())
    }

    fn documents(&self) -> Result<Vec<NamespaceDoc>, StoreError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::Io(self.dir.clone(), e))?;

        let mut docs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::Io(self.dir.clone(), e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXT) {
                continue;
            }
            if let Some(doc) = Self::read_doc(&path)? {
                docs.push(doc);
            }
        }
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(docs)
    }
}
