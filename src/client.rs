//! Settings client tying schema, bus and notifications together.

use crate::bus::{DbusSettingsBus, SettingsBus};
use crate::config::ClientConfig;
use crate::error::{Result, SettingsError};
use crate::locale;
use crate::notify::{KeyPrefix, Listener, NotificationRegistry};
use crate::schema::SchemaStore;
use crate::types::{NotifyId, SchemaEntry, Signature, Value, ValueChange};
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// Reads and writes display-manager settings and delivers change
/// notifications.
///
/// Create one at startup and hand references to every component that needs
/// settings. Change events are queued as they arrive and delivered to
/// listeners only from [`dispatch_pending`](Self::dispatch_pending), on the
/// thread that calls it.
pub struct SettingsClient {
    schemas: Arc<SchemaStore>,
    bus: Box<dyn SettingsBus>,
    registry: NotificationRegistry,
    changes: Receiver<ValueChange>,
}

impl SettingsClient {
    /// Create a client over an already connected bus.
    ///
    /// Fails if the bus refuses to deliver change notifications.
    pub fn new(schemas: Arc<SchemaStore>, bus: impl SettingsBus + 'static) -> Result<Self> {
        let changes = bus.watch()?;
        Ok(Self {
            schemas,
            bus: Box::new(bus),
            registry: NotificationRegistry::new(),
            changes,
        })
    }

    /// Parse the configured schema file and connect to the configured bus.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let schemas = SchemaStore::parse(&config.schema_file, &config.namespace_root)?;
        let bus = DbusSettingsBus::connect(&config.bus)?;
        Self::new(Arc::new(schemas), bus)
    }

    pub fn schemas(&self) -> &Arc<SchemaStore> {
        &self.schemas
    }

    // --- Raw values ---

    /// Fetch the raw stored value of `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not in the schema.
    pub fn get_value(&self, key: &str) -> Result<String> {
        self.schemas.entry(key);
        self.fetch(key)
    }

    /// Store a raw value for `key`. Failures are logged and returned; there
    /// is no retry.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not in the schema.
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.schemas.entry(key);
        self.bus.set_value(key, value).map_err(|e| {
            tracing::warn!(key, error = %e, "failed to store setting");
            e
        })
    }

    fn fetch(&self, key: &str) -> Result<String> {
        self.bus.get_value(key).map_err(|e| {
            tracing::warn!(key, error = %e, "failed to fetch setting");
            e
        })
    }

    // --- Typed values ---

    /// Fetch and decode `key`, falling back to the schema default when the
    /// service has no usable value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not in the schema or is declared with a different
    /// signature than `signature`.
    pub fn get_typed(&self, key: &str, signature: Signature) -> Value {
        let entry = self.checked_entry(key, signature);

        if let Ok(text) = self.fetch(key) {
            match Value::decode(signature, &text) {
                Ok(value) => return value,
                Err(e) => {
                    tracing::warn!(
                        key,
                        error = %e,
                        "stored setting does not decode, using default"
                    );
                }
            }
        }

        match entry.default_typed() {
            Ok(value) => value,
            Err(e) => panic!("schema default for {key:?} does not decode: {e}"),
        }
    }

    pub fn get_string(&self, key: &str) -> String {
        match self.get_typed(key, Signature::String) {
            Value::String(s) => s,
            other => unreachable!("decoded {other:?} for a string key"),
        }
    }

    pub fn get_boolean(&self, key: &str) -> bool {
        match self.get_typed(key, Signature::Boolean) {
            Value::Boolean(b) => b,
            other => unreachable!("decoded {other:?} for a boolean key"),
        }
    }

    pub fn get_int(&self, key: &str) -> i32 {
        match self.get_typed(key, Signature::Int) {
            Value::Int(i) => i,
            other => unreachable!("decoded {other:?} for an integer key"),
        }
    }

    /// Encode and store a typed value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not in the schema or its signature differs from the
    /// value's.
    pub fn set_typed(&self, key: &str, value: &Value) -> Result<()> {
        self.checked_entry(key, value.signature());
        self.set_value(key, &value.encode())
    }

    pub fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_typed(key, &Value::String(value.to_string()))
    }

    pub fn set_boolean(&self, key: &str, value: bool) -> Result<()> {
        self.set_typed(key, &Value::Boolean(value))
    }

    pub fn set_int(&self, key: &str, value: i32) -> Result<()> {
        self.set_typed(key, &Value::Int(value))
    }

    fn checked_entry(&self, key: &str, signature: Signature) -> SchemaEntry {
        let entry = self.schemas.entry(key);
        assert_eq!(
            entry.signature, signature,
            "settings key {key:?} is declared as {} but used as {}",
            entry.signature, signature
        );
        entry
    }

    // --- Localized strings ---

    /// Fetch a string in the best available language.
    ///
    /// Tries `key[lang]` for every variant of `locale`, or of the process's
    /// preferred languages when `locale` is `None`, then the bare key.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not a string key of the schema.
    pub fn get_localized_string(&self, key: &str, locale: Option<&str>) -> Result<String> {
        let languages = match locale {
            Some(locale) => locale::locale_variants(locale),
            None => locale::language_names(),
        };
        self.get_localized_string_in(key, &languages)
    }

    /// Like [`get_localized_string`](Self::get_localized_string) with an
    /// explicit language list, most preferred first.
    pub fn get_localized_string_in(&self, key: &str, languages: &[String]) -> Result<String> {
        self.checked_entry(key, Signature::String);

        for lang in languages.iter().filter(|l| l.as_str() != "C") {
            let localized = format!("{key}[{lang}]");
            if let Ok(value) = self.bus.get_value(&localized) {
                return Ok(value);
            }
        }

        self.bus.get_value(key).map_err(|e| {
            tracing::debug!(key, error = %e, "no localized or plain value");
            SettingsError::Unavailable(key.to_string())
        })
    }

    // --- Notifications ---

    /// Register a listener for changes to keys starting with `root`.
    pub fn notify_add(
        &self,
        root: impl Into<KeyPrefix>,
        listener: impl Listener + 'static,
    ) -> NotifyId {
        self.registry.add(root, listener)
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn notify_remove(&self, id: NotifyId) {
        self.registry.remove(id);
    }

    pub fn registry(&self) -> &NotificationRegistry {
        &self.registry
    }

    /// Apply one change: update the cached value and notify listeners.
    ///
    /// Changes for keys the schema does not declare are logged and ignored.
    /// Returns the number of listeners notified.
    pub fn handle_change(&self, change: &ValueChange) -> usize {
        self.apply_change(change).unwrap_or(0)
    }

    /// Deliver every queued change without blocking. Returns how many
    /// changes were applied.
    pub fn dispatch_pending(&self) -> usize {
        let mut applied = 0;
        while let Ok(change) = self.changes.try_recv() {
            if self.apply_change(&change).is_some() {
                applied += 1;
            }
        }
        applied
    }

    fn apply_change(&self, change: &ValueChange) -> Option<usize> {
        let Some(entry) = self.schemas.set_cached_value(&change.key, &change.new_value) else {
            tracing::warn!(key = %change.key, "change for a key missing from the schema");
            return None;
        };
        tracing::debug!(
            key = %change.key,
            old = %change.old_value,
            new = %change.new_value,
            "setting changed"
        );
        Some(self.registry.dispatch(&entry))
    }
}
