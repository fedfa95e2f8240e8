//! Snapshot-array source over BSD `getmntinfo(3)`.
//!
//! The kernel hands back `statfs` records whose mount flags are rendered to
//! option names through a static table.

use super::{DeviceHint, MountSource, RawMount};
#[cfg(any(test, target_os = "freebsd", target_os = "dragonfly"))]
use crate::classify::IGNORE_OPTION;
use crate::config::SourceConfig;
use rofs_error::{MountListError, MountListResult};

/// One mount flag bit and the option name it renders as.
#[derive(Debug, Clone, Copy)]
pub struct FlagName {
    pub bit: u64,
    pub name: &'static str,
}

const fn flag(bit: u64, name: &'static str) -> FlagName {
    FlagName { bit, name }
}

pub const MNT_RDONLY: u64 = 0x0000_0001;

/// `<sys/mount.h>` flag names shared by the BSD family.
pub const COMMON_MOUNT_FLAGS: &[FlagName] = &[
    flag(0x0000_0002, "sync"),
    flag(0x0000_0004, "noexec"),
    flag(0x0000_0008, "nosuid"),
    flag(0x0000_0040, "async"),
    flag(0x0000_1000, "local"),
    flag(0x0000_2000, "quota"),
    flag(0x0000_4000, "rootfs"),
];

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub const PLATFORM_MOUNT_FLAGS: &[FlagName] = &[
    flag(0x0000_0010, "nodev"),
    flag(0x0000_0020, "union"),
    flag(0x0000_0100, "exported"),
    flag(0x0000_0400, "quarantine"),
    flag(0x0010_0000, "nobrowse"),
    flag(0x0040_0000, "automounted"),
    flag(0x0080_0000, "journaled"),
    flag(0x1000_0000, "noatime"),
];

#[cfg(target_os = "freebsd")]
pub const PLATFORM_MOUNT_FLAGS: &[FlagName] = &[
    flag(0x0000_0010, "nfsv4acls"),
    flag(0x0000_0020, "union"),
    flag(0x0000_8000, "user"),
    flag(0x0020_0000, "softdep"),
    flag(0x0040_0000, "nosymfollow"),
    flag(0x0080_0000, IGNORE_OPTION),
    flag(0x0800_0000, "acls"),
    flag(0x1000_0000, "noatime"),
];

#[cfg(target_os = "dragonfly")]
pub const PLATFORM_MOUNT_FLAGS: &[FlagName] = &[
    flag(0x0000_0010, "nodev"),
    flag(0x0000_0020, "union"),
    flag(0x0000_8000, "user"),
    flag(0x0020_0000, "softdep"),
    flag(0x0080_0000, IGNORE_OPTION),
    flag(0x1000_0000, "noatime"),
];

#[cfg(target_os = "openbsd")]
pub const PLATFORM_MOUNT_FLAGS: &[FlagName] = &[
    flag(0x0000_0010, "nodev"),
    flag(0x0000_0800, "wxallowed"),
    flag(0x0000_8000, "noatime"),
    flag(0x0400_0000, "softdep"),
];

#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd"
)))]
pub const PLATFORM_MOUNT_FLAGS: &[FlagName] = &[];

/// Renders a flag word as a comma-separated option list, `ro`/`rw` first.
pub fn flags_to_options(flags: u64, tables: &[&[FlagName]]) -> String {
    let mut options = vec![if flags & MNT_RDONLY != 0 { "ro" } else { "rw" }];
    options.extend(
        tables
            .iter()
            .flat_map(|table| table.iter())
            .filter(|f| flags & f.bit != 0)
            .map(|f| f.name),
    );
    options.join(",")
}

/// NUL-terminated C character array to an owned string.
pub fn c_chars_to_string(chars: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Builds a record from the string fields and flag word of one `statfs`.
pub fn snapshot_record(from: &str, on: &str, fs_type: &str, flags: u64) -> RawMount {
    let mut raw = RawMount::new(
        from,
        on,
        fs_type,
        flags_to_options(flags, &[COMMON_MOUNT_FLAGS, PLATFORM_MOUNT_FLAGS]),
    );
    raw.readonly = Some(flags & MNT_RDONLY != 0);
    raw.device = DeviceHint::Unknown;
    raw
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotSource;

impl SnapshotSource {
    pub fn new() -> Self {
        Self
    }

    pub fn from_config(_config: &SourceConfig) -> Self {
        Self
    }
}

/// Records copied out of the libc-owned snapshot buffer.
#[derive(Debug)]
pub struct SnapshotEntries {
    records: std::vec::IntoIter<RawMount>,
}

impl Iterator for SnapshotEntries {
    type Item = MountListResult<RawMount>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.next().map(Ok)
    }
}

impl MountSource for SnapshotSource {
    type Entries = SnapshotEntries;

    fn name(&self) -> &str {
        "getmntinfo"
    }

    fn fetch_raw_entries(&self) -> MountListResult<SnapshotEntries> {
        let records =
            query_mounts().map_err(|err| MountListError::unavailable(self.name(), err))?;
        log::debug!("getmntinfo returned {} mounts", records.len());
        Ok(SnapshotEntries {
            records: records.into_iter(),
        })
    }
}

/// `MNT_NOWAIT` from `<sys/mount.h>`; libc does not export it on DragonFly.
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd"
))]
const GETMNTINFO_NOWAIT: libc::c_int = 2;

#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd"
))]
fn query_mounts() -> std::io::Result<Vec<RawMount>> {
    let mut buf: *mut libc::statfs = std::ptr::null_mut();
    // SAFETY: on success `buf` points at `count` statfs records owned by
    // libc and valid until the next getmntinfo call on this thread.
    let count = unsafe { libc::getmntinfo(&mut buf, GETMNTINFO_NOWAIT) };
    if count <= 0 || buf.is_null() {
        return Err(std::io::Error::last_os_error());
    }
    let stats = unsafe { std::slice::from_raw_parts(buf, count as usize) };

    Ok(stats
        .iter()
        .map(|st| {
            snapshot_record(
                &c_chars_to_string(&st.f_mntfromname),
                &c_chars_to_string(&st.f_mntonname),
                &c_chars_to_string(&st.f_fstypename),
                st.f_flags as u32 as u64,
            )
        })
        .collect())
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "openbsd"
)))]
fn query_mounts() -> std::io::Result<Vec<RawMount>> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "getmntinfo is not available on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_FLAGS: &[FlagName] = &[flag(0x10, "nodev"), flag(0x0080_0000, IGNORE_OPTION)];

    #[test]
    fn flags_render_in_table_order() {
        let flags = MNT_RDONLY | 0x4 | 0x1000;
        assert_eq!(
            flags_to_options(flags, &[COMMON_MOUNT_FLAGS]),
            "ro,noexec,local"
        );
        assert_eq!(flags_to_options(0, &[COMMON_MOUNT_FLAGS]), "rw");
        assert_eq!(
            flags_to_options(0x10 | 0x8, &[COMMON_MOUNT_FLAGS, TEST_FLAGS]),
            "rw,nosuid,nodev"
        );
    }

    #[test]
    fn common_table_leaves_out_bits_that_differ_by_platform() {
        // 0x20 and 0x8000 mean different things on OpenBSD and FreeBSD.
        assert_eq!(
            flags_to_options(0x20 | 0x8000 | 0x1000_0000, &[COMMON_MOUNT_FLAGS]),
            "rw"
        );
    }

    #[test]
    fn c_chars_stop_at_nul() {
        let raw: Vec<libc::c_char> = b"/dev/disk1s1\0garbage"
            .iter()
            .map(|&b| b as libc::c_char)
            .collect();
        assert_eq!(c_chars_to_string(&raw), "/dev/disk1s1");
        assert_eq!(c_chars_to_string(&[]), "");
    }

    #[test]
    fn snapshot_record_supplies_readonly_and_unknown_device() {
        let raw = snapshot_record("/dev/disk1s1", "/", "apfs", MNT_RDONLY | 0x1000);
        assert_eq!(raw.readonly, Some(true));
        assert_eq!(raw.device, DeviceHint::Unknown);
        assert!(raw.options.starts_with("ro,"));
    }

    #[cfg(not(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "dragonfly",
        target_os = "openbsd"
    )))]
    #[test]
    fn unsupported_platform_is_unavailable() {
        let err = SnapshotSource::new().fetch_raw_entries().unwrap_err();
        assert_eq!(err.kind(), rofs_error::MountListErrorKind::SourceUnavailable);
    }
}
