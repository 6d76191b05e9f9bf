//! # Display-manager settings client
//!
//! Typed access to the settings published by the display-manager settings
//! service, with change notifications scoped by key prefix.
//!
//! ## Core Concepts
//!
//! - **Schema**: every key, its type signature and default, read from a
//!   schema description file at startup
//! - **Bus**: remote `GetValue` / `SetValue` calls and `ValueChanged`
//!   broadcasts
//! - **Notifications**: listeners registered under a key prefix
//! - **Client**: one context object combining the three
//!
//! ## Example
//!
//! ```ignore
//! use dmconf::{ClientConfig, SettingsClient};
//!
//! let client = SettingsClient::from_config(&ClientConfig::default())?;
//!
//! if client.get_boolean("/daemon/TimedLoginEnable") {
//!     let delay = client.get_int("/daemon/TimedLoginDelay");
//! }
//!
//! let id = client.notify_add("/greeter", |_id, entry: &SchemaEntry| {
//!     println!("{} changed to {}", entry.key, entry.value);
//! });
//!
//! // From the main loop:
//! client.dispatch_pending();
//! ```

pub mod bus;
pub mod client;
pub mod config;
pub mod disks;
pub mod error;
pub mod locale;
pub mod notify;
pub mod schema;
pub mod types;

// Re-exports
pub use bus::{DbusSettingsBus, MemoryBus, SettingsBus};
pub use client::SettingsClient;
pub use config::{BusConfig, BusKind, ClientConfig};
pub use error::{Result, SettingsError};
pub use notify::{KeyPrefix, Listener, NotificationRegistry};
pub use schema::SchemaStore;
pub use types::*;
