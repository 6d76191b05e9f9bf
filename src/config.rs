//! Client configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the installed schema description.
pub const DEFAULT_SCHEMA_FILE: &str = "/usr/share/mdm/mdm.schemas";
/// Well-known name of the display-manager settings service.
pub const DEFAULT_SERVICE: &str = "org.mate.DisplayManager";
/// Object path of the settings object.
pub const DEFAULT_OBJECT_PATH: &str = "/org/mate/DisplayManager/Settings";

/// Settings client configuration.
///
/// Every field has a default, so an empty TOML document is a valid config:
///
/// ```toml
/// schema_file = "/usr/share/mdm/mdm.schemas"
/// namespace_root = "/"
///
/// [bus]
/// kind = "system"
/// service = "org.mate.DisplayManager"
/// path = "/org/mate/DisplayManager/Settings"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Schema description file.
    pub schema_file: PathBuf,

    /// Prefix joined onto relative schema keys.
    pub namespace_root: String,

    /// Where the settings service lives.
    pub bus: BusConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            schema_file: PathBuf::from(DEFAULT_SCHEMA_FILE),
            namespace_root: "/".to_string(),
            bus: BusConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Which message bus to connect to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    System,
    Session,
}

/// Settings service endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub kind: BusKind,
    pub service: String,
    pub path: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            kind: BusKind::System,
            service: DEFAULT_SERVICE.to_string(),
            path: DEFAULT_OBJECT_PATH.to_string(),
        }
    }
}
