//! Mount source over `/proc/self/mountinfo` (and similar mountinfo files).
//!
//! Unlike the mtab, mountinfo carries the kernel's `major:minor` device
//! number, so records leave here with a trustworthy device id.

use crate::classify::is_readonly;
use crate::config::{SourceConfig, DEFAULT_MOUNTINFO};
use crate::source::table::{unescape_mount_path, TableEntries};
use crate::source::{DeviceHint, MountSource, RawMount};
use rofs_error::MountListResult;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct MountInfoSource {
    path: PathBuf,
    location: String,
}

impl MountInfoSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        Self { path, location }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.table_path_or(DEFAULT_MOUNTINFO))
    }
}

impl MountSource for MountInfoSource {
    type Entries = TableEntries;

    fn name(&self) -> &str {
        &self.location
    }

    fn fetch_raw_entries(&self) -> MountListResult<TableEntries> {
        TableEntries::open(&self.path, parse_mountinfo_line, None)
    }
}

/// Parses one mountinfo line.
///
/// Format:
///   `<id> <parent> <major:minor> <root> <mount point> <mount opts> [optional...] - <fstype> <source> <super opts>`
///
/// The per-mount options are kept as `options`. The entry is read-only if
/// either the mount or its superblock is, so a read-only bind and a
/// filesystem the kernel forced read-only (`errors=remount-ro`) both count.
pub fn parse_mountinfo_line(line: &str) -> Option<RawMount> {
    let (pre, post) = line.trim_end_matches(['\n', '\r']).split_once(" - ")?;
    let pre_fields: Vec<&str> = pre.split_whitespace().collect();
    if pre_fields.len() < 6 {
        log::warn!("skipping short mountinfo line: {line:?}");
        return None;
    }
    let mut post_fields = post.split_whitespace();
    let fs_type = post_fields.next()?;
    let source = post_fields.next().unwrap_or("none");
    let super_options = post_fields.next().unwrap_or_default();
    let mount_options = pre_fields[5];

    let mut raw = RawMount::new(
        unescape_mount_path(source),
        unescape_mount_path(pre_fields[4]),
        unescape_mount_path(fs_type),
        mount_options,
    );
    raw.readonly = Some(is_readonly(mount_options) || is_readonly(super_options));
    raw.device = parse_major_minor(pre_fields[2])
        .map(DeviceHint::Known)
        .unwrap_or(DeviceHint::Unknown);
    Some(raw)
}

fn parse_major_minor(field: &str) -> Option<u64> {
    let (major, minor) = field.split_once(':')?;
    let major: u64 = major.parse().ok()?;
    let minor: u64 = minor.parse().ok()?;
    Some(nix::sys::stat::makedev(major, minor))
}
