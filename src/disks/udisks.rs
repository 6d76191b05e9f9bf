//! UDisks2 client over the system bus.

use super::{DiskError, DiskService, FormatOptions, VolumeInfo};
use std::collections::HashMap;
use zbus::blocking::Connection;
use zbus::zvariant::{OwnedObjectPath, Value};
use zbus::{dbus_proxy, fdo, CacheProperties};

/// Daemon errors that mean the user backed out.
const CANCEL_ERRORS: [&str; 2] = [
    "org.freedesktop.UDisks2.Error.Cancelled",
    "org.freedesktop.UDisks2.Error.NotAuthorizedDismissed",
];

/// Replies to reading a property of an interface the object does not carry.
const MISSING_INTERFACE_ERRORS: [&str; 3] = [
    "org.freedesktop.DBus.Error.InvalidArgs",
    "org.freedesktop.DBus.Error.UnknownInterface",
    "org.freedesktop.DBus.Error.UnknownProperty",
];

/// Object path the daemon uses for "no object".
const NO_OBJECT: &str = "/";

#[dbus_proxy(
    interface = "org.freedesktop.UDisks2.Manager",
    default_service = "org.freedesktop.UDisks2",
    default_path = "/org/freedesktop/UDisks2/Manager"
)]
trait Manager {
    fn resolve_device(
        &self,
        devspec: &HashMap<&str, &Value<'_>>,
        options: &HashMap<&str, &Value<'_>>,
    ) -> zbus::Result<Vec<OwnedObjectPath>>;
}

#[dbus_proxy(
    interface = "org.freedesktop.UDisks2.Block",
    default_service = "org.freedesktop.UDisks2"
)]
trait Block {
    fn format(&self, fs_type: &str, options: &HashMap<&str, Value<'_>>) -> zbus::Result<()>;

    #[dbus_proxy(property)]
    fn device(&self) -> zbus::Result<Vec<u8>>;

    #[dbus_proxy(property)]
    fn crypto_backing_device(&self) -> zbus::Result<OwnedObjectPath>;

    #[dbus_proxy(property)]
    fn read_only(&self) -> zbus::Result<bool>;

    #[dbus_proxy(property)]
    fn id_type(&self) -> zbus::Result<String>;
}

#[dbus_proxy(
    interface = "org.freedesktop.UDisks2.Filesystem",
    default_service = "org.freedesktop.UDisks2"
)]
trait Filesystem {
    fn mount(&self, options: &HashMap<&str, &Value<'_>>) -> zbus::Result<String>;

    fn unmount(&self, options: &HashMap<&str, &Value<'_>>) -> zbus::Result<()>;

    #[dbus_proxy(property)]
    fn mount_points(&self) -> zbus::Result<Vec<Vec<u8>>>;
}

#[dbus_proxy(
    interface = "org.freedesktop.UDisks2.PartitionTable",
    default_service = "org.freedesktop.UDisks2"
)]
trait PartitionTable {
    #[dbus_proxy(property, name = "Type")]
    fn type_(&self) -> zbus::Result<String>;
}

impl From<zbus::Error> for DiskError {
    fn from(e: zbus::Error) -> Self {
        match &e {
            zbus::Error::MethodError(name, message, _) => {
                if CANCEL_ERRORS.contains(&name.as_str()) {
                    DiskError::Cancelled
                } else {
                    DiskError::Daemon(message.clone().unwrap_or_else(|| name.to_string()))
                }
            }
            _ => DiskError::Daemon(e.to_string()),
        }
    }
}

fn is_missing_interface(e: &zbus::Error) -> bool {
    match e {
        zbus::Error::MethodError(name, _, _) => MISSING_INTERFACE_ERRORS.contains(&name.as_str()),
        zbus::Error::FDO(e) => matches!(
            **e,
            fdo::Error::InvalidArgs(_)
                | fdo::Error::UnknownInterface(_)
                | fdo::Error::UnknownProperty(_)
        ),
        _ => false,
    }
}

/// Read a property that only some objects carry.
///
/// `None` when the object lacks the interface. Any other failure is an error,
/// never a silent "absent".
fn optional_property<T>(result: zbus::Result<T>) -> Result<Option<T>, DiskError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_missing_interface(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// `Block.Format` options for a request.
fn format_options(options: &FormatOptions) -> HashMap<&'static str, Value<'_>> {
    let mut map = HashMap::new();
    if !options.label.is_empty() {
        map.insert("label", Value::from(options.label.as_str()));
    }
    if options.take_ownership {
        map.insert("take-ownership", Value::from(true));
    }
    if options.tear_down {
        map.insert("tear-down", Value::from(true));
    }
    map
}

/// Device files and mount points arrive as NUL-terminated byte strings.
fn decode_byte_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Disk daemon reached through `org.freedesktop.UDisks2`.
pub struct UDisks2Service {
    connection: Connection,
}

impl UDisks2Service {
    pub fn connect() -> Result<Self, DiskError> {
        let connection =
            Connection::system().map_err(|e| DiskError::DaemonUnavailable(e.to_string()))?;
        Ok(Self { connection })
    }

    fn block(&self, object: &str) -> Result<BlockProxyBlocking<'static>, DiskError> {
        Ok(BlockProxyBlocking::builder(&self.connection)
            .path(object.to_string())?
            .cache_properties(CacheProperties::No)
            .build()?)
    }

    fn filesystem(&self, object: &str) -> Result<FilesystemProxyBlocking<'static>, DiskError> {
        Ok(FilesystemProxyBlocking::builder(&self.connection)
            .path(object.to_string())?
            .cache_properties(CacheProperties::No)
            .build()?)
    }

    fn has_partition_table(&self, object: &str) -> Result<bool, DiskError> {
        let table = PartitionTableProxyBlocking::builder(&self.connection)
            .path(object.to_string())?
            .cache_properties(CacheProperties::No)
            .build()?;
        Ok(optional_property(table.type_())?.is_some())
    }

    /// Device file of the encrypted device behind a cleartext device.
    fn crypto_backing_device_file(
        &self,
        block: &BlockProxyBlocking<'_>,
    ) -> Result<Option<String>, DiskError> {
        let backing = block.crypto_backing_device()?;
        if backing.as_str() == NO_OBJECT {
            return Ok(None);
        }
        let device = self.block(backing.as_str())?.device()?;
        Ok(Some(decode_byte_string(&device)))
    }
}

impl DiskService for UDisks2Service {
    fn resolve(&self, device_file: &str) -> Result<Option<VolumeInfo>, DiskError> {
        let manager = ManagerProxyBlocking::new(&self.connection)
            .map_err(|e| DiskError::DaemonUnavailable(e.to_string()))?;

        let path = Value::from(device_file);
        let devspec = HashMap::from([("path", &path)]);
        let objects = manager.resolve_device(&devspec, &HashMap::new())?;
        let Some(object) = objects.into_iter().next() else {
            return Ok(None);
        };
        let object = object.as_str().to_string();
        tracing::debug!(device_file, %object, "resolved device");

        let block = self.block(&object)?;
        // Not every block device carries a filesystem interface.
        let mount_points: Vec<String> = optional_property(self.filesystem(&object)?.mount_points())?
            .map(|points| points.iter().map(|p| decode_byte_string(p)).collect())
            .unwrap_or_default();

        Ok(Some(VolumeInfo {
            crypto_backing_device: self.crypto_backing_device_file(&block)?,
            partition_table: self.has_partition_table(&object)?,
            read_only: block.read_only()?,
            id_type: block.id_type()?,
            mount_points,
            device_file: device_file.to_string(),
            object,
        }))
    }

    fn unmount(&self, volume: &VolumeInfo) -> Result<(), DiskError> {
        Ok(self.filesystem(&volume.object)?.unmount(&HashMap::new())?)
    }

    fn format(&self, volume: &VolumeInfo, options: &FormatOptions) -> Result<(), DiskError> {
        let block = self.block(&volume.object)?;
        Ok(block.format(&options.fs_type, &format_options(options))?)
    }

    fn mount(&self, volume: &VolumeInfo) -> Result<String, DiskError> {
        Ok(self.filesystem(&volume.object)?.mount(&HashMap::new())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_byte_string() {
        assert_eq!(decode_byte_string(b"/media/usb\0"), "/media/usb");
        assert_eq!(decode_byte_string(b"/dev/sdb1"), "/dev/sdb1");
        assert_eq!(decode_byte_string(b""), "");
    }

    #[test]
    fn test_missing_interface_reads_as_absent() {
        let missing = zbus::Error::FDO(Box::new(fdo::Error::UnknownInterface(
            "org.freedesktop.UDisks2.PartitionTable".into(),
        )));
        assert_eq!(optional_property::<String>(Err(missing)).unwrap(), None);

        let bad_args = zbus::Error::FDO(Box::new(fdo::Error::InvalidArgs("no such".into())));
        assert_eq!(optional_property::<String>(Err(bad_args)).unwrap(), None);

        assert_eq!(optional_property(Ok("dos".to_string())).unwrap(), Some("dos".into()));
    }

    #[test]
    fn test_other_failures_are_not_absent() {
        let timeout = zbus::Error::FDO(Box::new(fdo::Error::NoReply("timed out".into())));
        assert!(matches!(
            optional_property::<String>(Err(timeout)),
            Err(DiskError::Daemon(_))
        ));

        let denied = zbus::Error::FDO(Box::new(fdo::Error::AccessDenied("polkit".into())));
        assert!(optional_property::<bool>(Err(denied)).is_err());

        let io = zbus::Error::Failure("connection reset".into());
        assert!(optional_property::<Vec<Vec<u8>>>(Err(io)).is_err());
    }

    #[test]
    fn test_format_options() {
        let plain = FormatOptions {
            fs_type: "vfat".into(),
            label: String::new(),
            take_ownership: false,
            tear_down: false,
        };
        assert!(format_options(&plain).is_empty());

        let owned = FormatOptions {
            fs_type: "ext4".into(),
            label: "backup".into(),
            take_ownership: true,
            tear_down: true,
        };
        let map = format_options(&owned);
        assert_eq!(map.len(), 3);
        assert_eq!(map["label"], Value::from("backup"));
        assert_eq!(map["take-ownership"], Value::from(true));
        assert_eq!(map["tear-down"], Value::from(true));
    }
}
