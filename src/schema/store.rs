//! In-memory table of schema entries.

use super::parser::parse_schema_markup;
use crate::error::{Result, SettingsError};
use crate::types::{SchemaEntry, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// The set of known settings keys.
///
/// Membership is fixed once parsed. Only the cached `value` of an entry
/// changes afterwards, as change notifications arrive.
pub struct SchemaStore {
    /// Entries by full key.
    entries: RwLock<HashMap<String, SchemaEntry>>,
    /// Keys in file order.
    order: Vec<String>,
}

impl SchemaStore {
    /// Read and parse a schema description file.
    pub fn parse(path: impl AsRef<Path>, namespace_root: &str) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let entries = parse_schema_markup(&text, path, namespace_root)?;
        tracing::info!(
            path = %path.display(),
            keys = entries.len(),
            "loaded settings schema"
        );
        Self::from_entries(entries)
    }

    /// Parse schema markup held in memory.
    pub fn parse_str(text: &str, namespace_root: &str) -> Result<Self> {
        let entries = parse_schema_markup(text, Path::new("<memory>"), namespace_root)?;
        Self::from_entries(entries)
    }

    /// Build a store from already materialized entries.
    ///
    /// Every default must decode under its entry's signature. Later
    /// duplicates replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = SchemaEntry>) -> Result<Self> {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for entry in entries {
            if let Err(e) = Value::decode(entry.signature, &entry.default_value) {
                return Err(SettingsError::InvalidSchema(format!(
                    "{}: default does not match signature {}: {e}",
                    entry.key, entry.signature
                )));
            }
            if !map.contains_key(&entry.key) {
                order.push(entry.key.clone());
            }
            map.insert(entry.key.clone(), entry);
        }
        Ok(Self {
            entries: RwLock::new(map),
            order,
        })
    }

    /// Look up an entry by key.
    pub fn lookup(&self, key: &str) -> Option<SchemaEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Look up an entry that must exist.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not in the schema. Callers only ever pass keys they
    /// compiled in, so a miss is a programming error.
    pub fn entry(&self, key: &str) -> SchemaEntry {
        match self.lookup(key) {
            Some(entry) => entry,
            None => panic!("settings key {key:?} is not defined in the schema"),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Replace the cached value of a key. Returns the updated entry, or `None`
    /// if the key is unknown.
    pub fn set_cached_value(&self, key: &str, value: &str) -> Option<SchemaEntry> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(key)?;
        entry.value = value.to_string();
        Some(entry.clone())
    }

    /// All keys, in the order they appeared in the schema file.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
