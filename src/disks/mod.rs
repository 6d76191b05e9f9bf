//! Formatting a volume through the disk-management daemon.
//!
//! The daemon does the privileged work; this module only resolves the device,
//! checks it is something that can be formatted, and sequences
//! unmount / format / mount requests.

mod udisks;

pub use udisks::UDisks2Service;

use thiserror::Error;

/// Filesystem created when nothing else is asked for.
pub const DEFAULT_FS_TYPE: &str = "vfat";

/// Errors from disk operations.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("Disk daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("No device for {0}")]
    NoDevice(String),

    #[error("{0} is not a volume")]
    NotAVolume(String),

    #[error("{0} is read-only")]
    ReadOnly(String),

    /// The user or the daemon cancelled. Callers normally stay quiet about it.
    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Disk daemon error: {0}")]
    Daemon(String),
}

impl DiskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DiskError::Cancelled)
    }
}

/// Daemon's view of one block device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Daemon object path.
    pub object: String,
    pub device_file: String,
    /// For an unlocked encrypted device, the device file of the encrypted
    /// device behind it.
    pub crypto_backing_device: Option<String>,
    /// Whole drive carrying a partition table rather than a volume.
    pub partition_table: bool,
    pub read_only: bool,
    /// Current filesystem type, empty if none.
    pub id_type: String,
    pub mount_points: Vec<String>,
}

impl VolumeInfo {
    pub fn is_mounted(&self) -> bool {
        !self.mount_points.is_empty()
    }
}

/// What to create on a volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatOptions {
    pub fs_type: String,
    /// Empty for no label.
    pub label: String,
    /// Hand the new filesystem's root to the requesting user.
    pub take_ownership: bool,
    /// Lock any unlocked encrypted device being formatted over.
    pub tear_down: bool,
}

/// Requests the format helper sends to the disk daemon.
pub trait DiskService {
    /// Look up the block device behind a device file.
    fn resolve(&self, device_file: &str) -> Result<Option<VolumeInfo>, DiskError>;

    fn unmount(&self, volume: &VolumeInfo) -> Result<(), DiskError>;

    /// Create a new filesystem, erasing the volume.
    fn format(&self, volume: &VolumeInfo, options: &FormatOptions) -> Result<(), DiskError>;

    /// Mount the volume, returning the mount point.
    fn mount(&self, volume: &VolumeInfo) -> Result<String, DiskError>;
}

/// Sequences a format request for one device file.
pub struct FormatTool<S> {
    service: S,
    pub fs_type: String,
    pub label: String,
}

impl<S: DiskService> FormatTool<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            fs_type: DEFAULT_FS_TYPE.to_string(),
            label: String::new(),
        }
    }

    /// Options sent for the current settings. Filesystems other than FAT
    /// record an owner, so ownership goes to the requesting user.
    pub fn format_options(&self, tear_down: bool) -> FormatOptions {
        FormatOptions {
            fs_type: self.fs_type.clone(),
            label: self.label.clone(),
            take_ownership: self.fs_type != "vfat",
            tear_down,
        }
    }

    /// Format `device_file` after `confirm` agrees, then mount the result.
    ///
    /// An unlocked encrypted device is formatted through the encrypted device
    /// behind it. Returns the new mount point.
    pub fn run(
        &self,
        device_file: &str,
        confirm: impl FnOnce(&VolumeInfo) -> bool,
    ) -> Result<String, DiskError> {
        let mut volume = self
            .service
            .resolve(device_file)?
            .ok_or_else(|| DiskError::NoDevice(device_file.to_string()))?;

        let mut cleartext = None;
        if let Some(backing) = volume.crypto_backing_device.clone() {
            tracing::info!(
                cleartext = %volume.device_file,
                %backing,
                "using encrypted backing device"
            );
            let backing_volume = self
                .service
                .resolve(&backing)?
                .ok_or_else(|| DiskError::NoDevice(backing.clone()))?;
            // no encrypted devices stacked inside each other
            if backing_volume.crypto_backing_device.is_some() {
                return Err(DiskError::NotAVolume(device_file.to_string()));
            }
            cleartext = Some(std::mem::replace(&mut volume, backing_volume));
        }

        if volume.partition_table {
            return Err(DiskError::NotAVolume(device_file.to_string()));
        }
        if volume.read_only {
            return Err(DiskError::ReadOnly(device_file.to_string()));
        }

        if !confirm(&volume) {
            return Err(DiskError::Cancelled);
        }

        for mounted in cleartext.iter().chain([&volume]).filter(|v| v.is_mounted()) {
            tracing::info!(device = %mounted.device_file, "unmounting before format");
            self.service.unmount(mounted)?;
        }

        tracing::info!(device = %volume.device_file, fs_type = %self.fs_type, "formatting");
        self.service.format(&volume, &self.format_options(cleartext.is_some()))?;

        self.service.mount(&volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FakeDisks {
        volumes: Vec<VolumeInfo>,
        calls: RefCell<Vec<String>>,
        fail_format: Option<DiskError>,
    }

    impl FakeDisks {
        fn with(volume: VolumeInfo) -> Self {
            Self {
                volumes: vec![volume],
                calls: RefCell::new(Vec::new()),
                fail_format: None,
            }
        }
    }

    impl DiskService for &FakeDisks {
        fn resolve(&self, device_file: &str) -> Result<Option<VolumeInfo>, DiskError> {
            Ok(self.volumes.iter().find(|v| v.device_file == device_file).cloned())
        }

        fn unmount(&self, volume: &VolumeInfo) -> Result<(), DiskError> {
            self.calls.borrow_mut().push(format!("unmount {}", volume.device_file));
            Ok(())
        }

        fn format(&self, volume: &VolumeInfo, options: &FormatOptions) -> Result<(), DiskError> {
            let mut call = format!("format {} {}", volume.device_file, options.fs_type);
            if options.take_ownership {
                call.push_str(" take-ownership");
            }
            if options.tear_down {
                call.push_str(" tear-down");
            }
            self.calls.borrow_mut().push(call);
            match &self.fail_format {
                Some(DiskError::Cancelled) => Err(DiskError::Cancelled),
                Some(e) => Err(DiskError::Daemon(e.to_string())),
                None => Ok(()),
            }
        }

        fn mount(&self, volume: &VolumeInfo) -> Result<String, DiskError> {
            self.calls.borrow_mut().push(format!("mount {}", volume.device_file));
            Ok("/media/usb".to_string())
        }
    }

    fn volume(device_file: &str) -> VolumeInfo {
        VolumeInfo {
            object: "/org/freedesktop/UDisks2/block_devices/sdb1".into(),
            device_file: device_file.into(),
            crypto_backing_device: None,
            partition_table: false,
            read_only: false,
            id_type: "ext4".into(),
            mount_points: vec![],
        }
    }

    #[test]
    fn test_format_unmounted_volume() {
        let disks = FakeDisks::with(volume("/dev/sdb1"));
        let tool = FormatTool::new(&disks);

        let mount_point = tool.run("/dev/sdb1", |_| true).unwrap();
        assert_eq!(mount_point, "/media/usb");
        assert_eq!(
            *disks.calls.borrow(),
            vec!["format /dev/sdb1 vfat", "mount /dev/sdb1"]
        );
    }

    #[test]
    fn test_mounted_volume_is_unmounted_first() {
        let mut v = volume("/dev/sdb1");
        v.mount_points = vec!["/media/old".into()];
        let disks = FakeDisks::with(v);

        FormatTool::new(&disks).run("/dev/sdb1", |_| true).unwrap();
        assert_eq!(disks.calls.borrow()[0], "unmount /dev/sdb1");
    }

    #[test]
    fn test_refused_confirmation_cancels() {
        let disks = FakeDisks::with(volume("/dev/sdb1"));
        let err = FormatTool::new(&disks).run("/dev/sdb1", |_| false).unwrap_err();
        assert!(err.is_cancelled());
        assert!(disks.calls.borrow().is_empty());
    }

    #[test]
    fn test_rejects_unknown_and_whole_drives() {
        let mut drive = volume("/dev/sdb");
        drive.partition_table = true;
        let disks = FakeDisks::with(drive);
        let tool = FormatTool::new(&disks);

        assert!(matches!(tool.run("/dev/sdc", |_| true), Err(DiskError::NoDevice(_))));
        assert!(matches!(tool.run("/dev/sdb", |_| true), Err(DiskError::NotAVolume(_))));
    }

    #[test]
    fn test_daemon_cancellation_propagates() {
        let mut disks = FakeDisks::with(volume("/dev/sdb1"));
        disks.fail_format = Some(DiskError::Cancelled);
        let err = FormatTool::new(&disks).run("/dev/sdb1", |_| true).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(disks.calls.borrow().len(), 1);
    }

    #[test]
    fn test_ownership_taken_for_non_fat_filesystems() {
        let disks = FakeDisks::with(volume("/dev/sdb1"));
        let mut tool = FormatTool::new(&disks);
        assert!(!tool.format_options(false).take_ownership);

        tool.fs_type = "ext4".into();
        tool.run("/dev/sdb1", |_| true).unwrap();
        assert_eq!(disks.calls.borrow()[0], "format /dev/sdb1 ext4 take-ownership");
    }

    #[test]
    fn test_cleartext_device_formats_backing_device() {
        let mut cleartext = volume("/dev/dm-0");
        cleartext.object = "/org/freedesktop/UDisks2/block_devices/dm_2d0".into();
        cleartext.crypto_backing_device = Some("/dev/sdb1".into());
        cleartext.mount_points = vec!["/media/secret".into()];
        let mut backing = volume("/dev/sdb1");
        backing.id_type = "crypto_LUKS".into();

        let disks = FakeDisks {
            volumes: vec![cleartext, backing],
            calls: RefCell::new(Vec::new()),
            fail_format: None,
        };

        let mut confirmed = None;
        FormatTool::new(&disks)
            .run("/dev/dm-0", |v| {
                confirmed = Some(v.device_file.clone());
                true
            })
            .unwrap();

        assert_eq!(confirmed.as_deref(), Some("/dev/sdb1"));
        assert_eq!(
            *disks.calls.borrow(),
            vec![
                "unmount /dev/dm-0",
                "format /dev/sdb1 vfat tear-down",
                "mount /dev/sdb1"
            ]
        );
    }

    #[test]
    fn test_stacked_encryption_rejected() {
        let mut outer = volume("/dev/dm-1");
        outer.crypto_backing_device = Some("/dev/dm-0".into());
        let mut inner = volume("/dev/dm-0");
        inner.crypto_backing_device = Some("/dev/sdb1".into());

        let disks = FakeDisks {
            volumes: vec![outer, inner],
            calls: RefCell::new(Vec::new()),
            fail_format: None,
        };
        let result = FormatTool::new(&disks).run("/dev/dm-1", |_| true);
        assert!(matches!(result, Err(DiskError::NotAVolume(_))));
        assert!(disks.calls.borrow().is_empty());
    }
}
