//! D-Bus transport to the display-manager settings service.

use super::SettingsBus;
use crate::config::{BusConfig, BusKind};
use crate::error::Result;
use crate::types::ValueChange;
use crossbeam_channel::{unbounded, Receiver};
use std::thread;
use zbus::blocking::Connection;
use zbus::dbus_proxy;

/// Proxy for `org.mate.DisplayManager.Settings`.
///
/// Destination and path come from [`BusConfig`].
#[dbus_proxy(interface = "org.mate.DisplayManager.Settings", assume_defaults = false)]
trait Settings {
    fn get_value(&self, key: &str) -> zbus::Result<String>;

    fn set_value(&self, key: &str, value: &str) -> zbus::Result<()>;

    #[dbus_proxy(signal)]
    fn value_changed(
        &self,
        key: String,
        old_value: String,
        new_value: String,
    ) -> zbus::Result<()>;
}

/// Blocking client of the settings service.
pub struct DbusSettingsBus {
    proxy: SettingsProxyBlocking<'static>,
}

impl DbusSettingsBus {
    /// Connect to the configured bus.
    ///
    /// Fails if the bus itself is unreachable. The settings service does not
    /// need to be running yet; calls made while it is absent fail one by one.
    pub fn connect(config: &BusConfig) -> Result<Self> {
        let connection = match config.kind {
            BusKind::System => Connection::system()?,
            BusKind::Session => Connection::session()?,
        };
        Self::with_connection(&connection, config)
    }

    pub fn with_connection(connection: &Connection, config: &BusConfig) -> Result<Self> {
        let proxy = SettingsProxyBlocking::builder(connection)
            .destination(config.service.clone())?
            .path(config.path.clone())?
            .build()?;
        tracing::info!(
            service = %config.service,
            path = %config.path,
            "connected to settings service"
        );
        Ok(Self { proxy })
    }
}

impl SettingsBus for DbusSettingsBus {
    fn get_value(&self, key: &str) -> Result<String> {
        Ok(self.proxy.get_value(key)?)
    }

    fn set_value(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.proxy.set_value(key, value)?)
    }

    fn watch(&self) -> Result<Receiver<ValueChange>> {
        let signals = self.proxy.receive_value_changed()?;
        let (tx, rx) = unbounded();

        thread::Builder::new()
            .name("settings-watch".into())
            .spawn(move || {
                for signal in signals {
                    let change = match signal.args() {
                        Ok(args) => ValueChange {
                            key: args.key().clone(),
                            old_value: args.old_value().clone(),
                            new_value: args.new_value().clone(),
                        },
                        Err(e) => {
                            tracing::warn!(error = %e, "malformed ValueChanged signal");
                            continue;
                        }
                    };
                    if tx.send(change).is_err() {
                        break;
                    }
                }
                tracing::debug!("settings change stream ended");
            })?;

        Ok(rx)
    }
}
