//! In-process settings service.

use super::SettingsBus;
use crate::error::{Result, SettingsError};
use crate::types::ValueChange;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct MemoryState {
    values: HashMap<String, String>,
    reachable: bool,
    watchers: Vec<Sender<ValueChange>>,
}

impl MemoryState {
    /// Store a value and broadcast if it changed. Watchers whose receiver
    /// is gone are dropped.
    fn store(&mut self, key: &str, value: &str) {
        let old_value = self
            .values
            .insert(key.to_string(), value.to_string())
            .unwrap_or_default();
        if old_value == value {
            return;
        }

        let change = ValueChange {
            key: key.to_string(),
            old_value,
            new_value: value.to_string(),
        };
        self.watchers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

/// A settings service living in this process.
///
/// Clones share the same table, so one handle can be given to a
/// [`SettingsClient`](crate::SettingsClient) while another plays the part of
/// other processes writing settings, or of the service going away.
#[derive(Clone)]
pub struct MemoryBus {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                values: HashMap::new(),
                reachable: true,
                watchers: Vec::new(),
            })),
        }
    }

    /// Service pre-populated with values. No changes are broadcast for them.
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let bus = Self::new();
        bus.state
            .lock()
            .values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        bus
    }

    /// Make every call fail (false) or succeed again (true).
    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().reachable = reachable;
    }

    pub fn is_reachable(&self) -> bool {
        self.state.lock().reachable
    }

    /// A write made by someone else. Broadcasts regardless of reachability.
    pub fn publish(&self, key: &str, value: &str) {
        self.state.lock().store(key, value);
    }

    /// Forget a stored value without broadcasting.
    pub fn unset(&self, key: &str) -> Option<String> {
        self.state.lock().values.remove(key)
    }

    /// Stored value, bypassing reachability.
    pub fn stored(&self, key: &str) -> Option<String> {
        self.state.lock().values.get(key).cloned()
    }

    pub fn watcher_count(&self) -> usize {
        self.state.lock().watchers.len()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsBus for MemoryBus {
    fn get_value(&self, key: &str) -> Result<String> {
        let state = self.state.lock();
        if !state.reachable {
            return Err(SettingsError::Bus("settings service unreachable".into()));
        }
        state
            .values
            .get(key)
            .cloned()
            .ok_or_else(|| SettingsError::Unavailable(key.to_string()))
    }

    fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        if !state.reachable {
            return Err(SettingsError::Bus("settings service unreachable".into()));
        }
        state.store(key, value);
        Ok(())
    }

    fn watch(&self) -> Result<Receiver<ValueChange>> {
        let (tx, rx) = unbounded();
        self.state.lock().watchers.push(tx);
        Ok(rx)
    }
}
