//! Mounted filesystem enumeration.
//!
//! [`read_file_system_list`] takes a fresh snapshot of the mount table
//! through the source compiled in for the target, classifies every entry
//! (pseudo, remote, read-only, device id) and returns the whole list or an
//! error, never a partial list.

pub mod assembler;
pub mod classify;
pub mod config;
pub mod entry;
pub mod guards;
#[cfg(target_os = "linux")]
pub mod procfs;
pub mod source;

#[cfg(not(unix))]
compile_error!("rofs-mountlist supports Unix targets only");

pub use assembler::{read_file_system_list, read_from_source};
pub use classify::{extract_device_id, has_option, is_readonly, Classifier};
pub use config::SourceConfig;
pub use entry::{MountEntry, MountList, MountListBuilder};
pub use guards::LockGuard;
pub use rofs_error::{MountListError, MountListErrorKind, MountListResult};
pub use source::{DeviceHint, FakeSource, HostSource, MountSource, RawMount};
