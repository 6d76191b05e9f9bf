//! Listener types for change notifications.

use crate::types::{NotifyId, SchemaEntry};

/// Receives change notifications for keys under a registration's root.
///
/// State the listener needs lives in the implementing value. It is dropped
/// when the registration is removed, which is where any cleanup belongs.
pub trait Listener: Send {
    /// Called with the updated entry after its cached value changed.
    fn on_change(&mut self, id: NotifyId, entry: &SchemaEntry);
}

impl<F> Listener for F
where
    F: FnMut(NotifyId, &SchemaEntry) + Send,
{
    fn on_change(&mut self, id: NotifyId, entry: &SchemaEntry) {
        self(id, entry)
    }
}

/// Key filter for a registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPrefix(pub String);

impl KeyPrefix {
    /// Plain string-prefix match, so `/apps/x` also matches `/apps/xyz`.
    pub fn matches(&self, key: &str) -> bool {
        key.starts_with(&self.0)
    }
}

impl From<&str> for KeyPrefix {
    fn from(root: &str) -> Self {
        KeyPrefix(root.to_string())
    }
}

impl From<String> for KeyPrefix {
    fn from(root: String) -> Self {
        KeyPrefix(root)
    }
}
