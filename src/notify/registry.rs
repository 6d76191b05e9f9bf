//! Registry of change listeners, fanned out by key prefix.

use crate::types::{NotifyId, SchemaEntry};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{KeyPrefix, Listener};

type SharedListener = Arc<Mutex<Box<dyn Listener>>>;

/// Internal registration state.
struct Registration {
    root: KeyPrefix,
    listener: SharedListener,
}

struct Table {
    registrations: HashMap<NotifyId, Registration>,
    /// Next id to try. Ids still in use are skipped after wrap-around.
    next_id: NotifyId,
}

/// Holds listeners and dispatches change events to the ones whose root is a
/// prefix of the changed key.
pub struct NotificationRegistry {
    table: RwLock<Table>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::starting_at(NotifyId::FIRST)
    }

    /// Registry whose first allocated id is `first` (clamped to positive).
    pub fn starting_at(first: NotifyId) -> Self {
        let next_id = if first.0 > 0 { first } else { NotifyId::FIRST };
        Self {
            table: RwLock::new(Table {
                registrations: HashMap::new(),
                next_id,
            }),
        }
    }

    /// Register a listener for keys starting with `root`.
    ///
    /// Nothing is dispatched on registration.
    pub fn add(&self, root: impl Into<KeyPrefix>, listener: impl Listener + 'static) -> NotifyId {
        let mut table = self.table.write();

        let mut id = table.next_id;
        while table.registrations.contains_key(&id) {
            id = id.next();
        }
        table.next_id = id.next();

        let root = root.into();
        tracing::debug!(%id, root = %root.0, "added settings listener");
        table.registrations.insert(
            id,
            Registration {
                root,
                listener: Arc::new(Mutex::new(Box::new(listener))),
            },
        );
        id
    }

    /// Remove a registration, dropping its listener.
    ///
    /// Returns false if `id` was not registered.
    pub fn remove(&self, id: NotifyId) -> bool {
        // Drop the registration after releasing the table lock, so a
        // listener's Drop may touch the registry.
        let removed = self.table.write().registrations.remove(&id);
        match removed {
            Some(_) => {
                tracing::debug!(%id, "removed settings listener");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: NotifyId) -> bool {
        self.table.read().registrations.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.table.read().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every listener whose root is a prefix of `entry.key`.
    ///
    /// Works on a snapshot of the table, so listeners may add or remove
    /// registrations from their callback. A listener removed before its turn
    /// is not called. Returns how many listeners ran.
    pub fn dispatch(&self, entry: &SchemaEntry) -> usize {
        let matching: Vec<(NotifyId, SharedListener)> = {
            let table = self.table.read();
            table
                .registrations
                .iter()
                .filter(|(_, reg)| reg.root.matches(&entry.key))
                .map(|(id, reg)| (*id, Arc::clone(&reg.listener)))
                .collect()
        };

        let mut invoked = 0;
        for (id, listener) in matching {
            if !self.contains(id) {
                continue;
            }
            match listener.try_lock() {
                Some(mut listener) => {
                    listener.on_change(id, entry);
                    invoked += 1;
                }
                None => {
                    tracing::warn!(%id, key = %entry.key, "skipping re-entrant notification");
                }
            }
        }
        invoked
    }
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
