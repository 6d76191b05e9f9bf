//! Change notifications for settings keys.
//!
//! Listeners register with a key-namespace root and are called for every
//! changed key under that root:
//!
//! ```ignore
//! let registry = NotificationRegistry::new();
//! let id = registry.add("/greeter", |id: NotifyId, entry: &SchemaEntry| {
//!     println!("{} is now {}", entry.key, entry.value);
//! });
//!
//! registry.dispatch(&changed_entry);
//! registry.remove(id);
//! ```
//!
//! No ordering is guaranteed between listeners for the same change.

mod registry;
mod types;

pub use registry::NotificationRegistry;
pub use types::{KeyPrefix, Listener};
