//! `tally inspect`: read persisted counters straight from the file store.
//!
//! Read-only and server-free. Safe to run next to a live server: documents
//! are replaced atomically, so a read never sees a half-written value.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;

use crate::actor::COUNT_KEY;
use crate::config::{StoreBackend, TallyConfig};
use crate::core::CounterName;
use crate::log;
use crate::store::{DurableStore, FileStore, NamespaceDoc};

/// One line of output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterRow {
    pub name: String,
    pub id: String,
    /// `None` when the counter was never written
    pub count: Option<i64>,
}

/// Execute inspect command
pub fn inspect_counters(config: &TallyConfig, names: &[String], json: bool) -> Result<()> {
    if config.store.backend == StoreBackend::Memory {
        log!("inspect"; "memory backend keeps nothing on disk");
        return Ok(());
    }

    let docs = if config.store.dir.is_dir() {
        FileStore::open(&config.store.dir)?
            .documents()
            .with_context(|| format!("failed to read {}", config.store.dir.display()))?
    } else {
        Vec::new()
    };

    let rows = collect_rows(&docs, names);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        log!("inspect"; "no counters in {}", config.store.dir.display());
    } else {
        print!("{}", render_table(&rows));
    }
    Ok(())
}

/// Rows for `names`, or for every stored counter when `names` is empty.
fn collect_rows(docs: &[NamespaceDoc], names: &[String]) -> Vec<CounterRow> {
    let row = |doc: &NamespaceDoc| CounterRow {
        name: doc.name.clone(),
        id: CounterName::new(&doc.name).actor_id().to_hex(),
        count: doc.entries.get(COUNT_KEY).and_then(Value::as_i64),
    };

    if names.is_empty() {
        return docs.iter().map(row).collect();
    }

    names
        .iter()
        .map(|name| match docs.iter().find(|doc| &doc.name == name) {
            Some(doc) => row(doc),
            None => CounterRow {
                name: name.clone(),
                id: CounterName::new(name).actor_id().to_hex(),
                count: None,
            },
        })
        .collect()
}

fn render_table(rows: &[CounterRow]) -> String {
    let width = rows
        .iter()
        .map(|row| row.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!("{:<width$}  {:<12}  {}\n", "NAME".bold(), "ID".bold(), "COUNT".bold());
    for row in rows {
        let count = row.count.map_or_else(|| "-".to_string(), |c| c.to_string());
        out.push_str(&format!("{:<width$}  {:<12}  {}\n", row.name, &row.id[..12], count));
    }
    let total = rows.len();
    out.push_str(&format!("{} counter{}\n", total, if total == 1 { "" } else { "s" }));
    out
}
