//! Transports to the settings service.
//!
//! The service exposes `GetValue(key) -> value`, `SetValue(key, value)` and a
//! `ValueChanged(key, old, new)` broadcast. [`DbusSettingsBus`] talks to the
//! real service; [`MemoryBus`] is an in-process stand-in.

mod dbus;
mod memory;

pub use dbus::DbusSettingsBus;
pub use memory::MemoryBus;

use crate::error::Result;
use crate::types::ValueChange;
use crossbeam_channel::Receiver;

/// Remote get/set of string-encoded values.
///
/// Calls block until the service answers or the call fails.
pub trait SettingsBus: Send + Sync {
    /// Fetch the stored value of `key`.
    fn get_value(&self, key: &str) -> Result<String>;

    /// Store `value` under `key`.
    fn set_value(&self, key: &str, value: &str) -> Result<()>;

    /// Start receiving `ValueChanged` broadcasts.
    ///
    /// Called once when a client is created; an error here means the client
    /// cannot start.
    fn watch(&self) -> Result<Receiver<ValueChange>>;
}

impl<B: SettingsBus + ?Sized> SettingsBus for Box<B> {
    fn get_value(&self, key: &str) -> Result<String> {
        (**self).get_value(key)
    }

    fn set_value(&self, key: &str, value: &str) -> Result<()> {
        (**self).set_value(key, value)
    }

    fn watch(&self) -> Result<Receiver<ValueChange>> {
        (**self).watch()
    }
}
