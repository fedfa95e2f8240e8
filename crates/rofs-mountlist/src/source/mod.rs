//! Mount-source adapters.
//!
//! Each adapter wraps one OS facility and yields [`RawMount`] records. The
//! adapter used by [`crate::read_file_system_list`] is fixed at build time
//! through [`HostSource`]; the others stay available for explicit use and
//! tests.

use crate::config::SourceConfig;
use rofs_error::MountListResult;

pub mod fake;
pub mod mnttab;
pub mod snapshot;
pub mod table;
pub mod vmount;

#[cfg(target_os = "linux")]
pub use crate::procfs::mountinfo::MountInfoSource;
pub use fake::{FakeSource, Operation};
pub use mnttab::LockedTableSource;
pub use snapshot::SnapshotSource;
pub use table::TableSource;
pub use vmount::BufferSource;

/// What the source knows about the device identifier of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceHint {
    /// Nothing supplied; derive it from a `dev=` option if policy allows.
    #[default]
    FromOptions,
    /// Supplied by the OS and trustworthy.
    Known(u64),
    /// The source states the identifier cannot be known.
    Unknown,
}

/// Unprocessed fields of one mount as produced by an adapter.
///
/// `Some` flags are authoritative and skip classifier derivation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMount {
    pub device_name: String,
    pub mount_dir: String,
    pub fs_type: String,
    pub options: String,
    pub dummy: Option<bool>,
    pub remote: Option<bool>,
    pub readonly: Option<bool>,
    pub device: DeviceHint,
}

impl RawMount {
    pub fn new(
        device_name: impl Into<String>,
        mount_dir: impl Into<String>,
        fs_type: impl Into<String>,
        options: impl Into<String>,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            mount_dir: mount_dir.into(),
            fs_type: fs_type.into(),
            options: options.into(),
            ..Self::default()
        }
    }
}

/// One mechanism for reading the current mount table.
pub trait MountSource {
    /// Lazy, finite, non-restartable record stream. It owns the OS handle
    /// and releases it when dropped.
    type Entries: Iterator<Item = MountListResult<RawMount>>;

    /// Human-readable location for logs and errors.
    fn name(&self) -> &str;

    /// Whether `fs_type` is always populated by this source.
    fn reliable_fs_type(&self) -> bool {
        true
    }

    /// Opens the facility. Fails with `SourceUnavailable` (or
    /// `LockAcquisitionFailed`) before any record is read.
    fn fetch_raw_entries(&self) -> MountListResult<Self::Entries>;
}

#[cfg(all(target_os = "linux", not(feature = "mountinfo")))]
pub type HostSource = TableSource;

#[cfg(all(target_os = "linux", feature = "mountinfo"))]
pub type HostSource = MountInfoSource;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
pub type HostSource = LockedTableSource;

#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd"
))]
pub type HostSource = SnapshotSource;

#[cfg(target_os = "aix")]
pub type HostSource = BufferSource;

#[cfg(not(any(
    target_os = "linux",
    target_os = "solaris",
    target_os = "illumos",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd",
    target_os = "aix"
)))]
pub type HostSource = TableSource;

/// Builds the compiled-in source from configuration.
pub fn host_source(config: &SourceConfig) -> HostSource {
    HostSource::from_config(config)
}
