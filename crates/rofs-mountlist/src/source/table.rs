//! Sequential text mount tables (`/etc/mtab`, `/proc/mounts`, `mnttab`).
//!
//! [`TableEntries`] streams any line-oriented table; the line format is a
//! plug-in [`LineParser`].

use super::{MountSource, RawMount};
use crate::classify::{has_option, IGNORE_OPTION};
use crate::config::{SourceConfig, DEFAULT_MTAB};
use crate::guards::LockGuard;
use rofs_error::{MountListError, MountListResult};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Turns one table line into a record; `None` skips the line.
pub type LineParser = fn(&str) -> Option<RawMount>;

/// Reads a getmntent-style table file.
#[derive(Debug, Clone)]
pub struct TableSource {
    path: PathBuf,
    location: String,
}

impl TableSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        Self { path, location }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.table_path_or(DEFAULT_MTAB))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MountSource for TableSource {
    type Entries = TableEntries;

    fn name(&self) -> &str {
        &self.location
    }

    fn fetch_raw_entries(&self) -> MountListResult<TableEntries> {
        TableEntries::open(&self.path, parse_mtab_line, None)
    }
}

/// Record stream over an open table file.
///
/// Field order matters: the reader is closed before the lock is released.
#[derive(Debug)]
pub struct TableEntries {
    reader: BufReader<File>,
    _lock: Option<LockGuard>,
    parse: LineParser,
    location: String,
    line: Vec<u8>,
    lines_read: usize,
    entries_read: usize,
    done: bool,
}

impl TableEntries {
    pub(crate) fn open(
        path: &Path,
        parse: LineParser,
        lock: Option<LockGuard>,
    ) -> MountListResult<Self> {
        let location = path.display().to_string();
        let file =
            File::open(path).map_err(|err| MountListError::unavailable(location.clone(), err))?;
        log::debug!("opened mount table {location}");
        Ok(Self {
            reader: BufReader::new(file),
            _lock: lock,
            parse,
            location,
            line: Vec::new(),
            lines_read: 0,
            entries_read: 0,
            done: false,
        })
    }
}

impl Iterator for TableEntries {
    type Item = MountListResult<RawMount>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.lines_read += 1;
                    let text = String::from_utf8_lossy(&self.line);
                    if let Cow::Owned(_) = text {
                        log::warn!(
                            "{}: line {} is not valid UTF-8; invalid bytes replaced",
                            self.location,
                            self.lines_read
                        );
                    }
                    match (self.parse)(&text) {
                        Some(raw) => {
                            self.entries_read += 1;
                            return Some(Ok(raw));
                        }
                        None => continue,
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(MountListError::failed(
                        self.location.clone(),
                        self.entries_read,
                        err,
                    )));
                }
            }
        }
        None
    }
}

impl Drop for TableEntries {
    fn drop(&mut self) {
        log::debug!(
            "closing mount table {} after {} entries",
            self.location,
            self.entries_read
        );
    }
}

/// Leading fields of a non-comment line, split by `split`.
fn line_fields<'a, I>(line: &'a str, split: impl FnOnce(&'a str) -> I) -> Option<[&'a str; 4]>
where
    I: Iterator<Item = &'a str>,
{
    let line = line.trim_end_matches(['\n', '\r']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut fields = split(trimmed);
    let (Some(device), Some(dir)) = (fields.next(), fields.next()) else {
        log::warn!("skipping short mount table line: {line:?}");
        return None;
    };
    let fs_type = fields.next().unwrap_or_default();
    let options = fields.next().unwrap_or_default();
    Some([device, dir, fs_type, options])
}

/// Parses an mtab line: `fsname dir type opts freq passno`, whitespace
/// separated, with octal escapes inside fields.
pub fn parse_mtab_line(line: &str) -> Option<RawMount> {
    let [device, dir, fs_type, options] = line_fields(line, str::split_whitespace)?;
    Some(RawMount::new(
        unescape_mount_path(device),
        unescape_mount_path(dir),
        unescape_mount_path(fs_type),
        unescape_mount_path(options),
    ))
}

/// Parses an SVR4 mnttab line: `special mountp fstype mntopts time`, tab
/// separated. Dummy is exactly the `ignore` option.
pub fn parse_mnttab_line(line: &str) -> Option<RawMount> {
    let [device, dir, fs_type, options] =
        line_fields(line, |l| l.split('\t').filter(|f| !f.is_empty()))?;
    let mut raw = RawMount::new(device, dir, fs_type, options);
    raw.dummy = Some(has_option(options, IGNORE_OPTION));
    Some(raw)
}

/// Decodes the octal escapes the kernel and libc write into mount tables.
pub fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_mtab_line_reads_four_fields() {
        let raw = parse_mtab_line("/dev/sda1 / ext4 rw,relatime 0 0\n").unwrap();
        assert_eq!(raw, RawMount::new("/dev/sda1", "/", "ext4", "rw,relatime"));
    }

    #[test]
    fn parse_mtab_line_unescapes_fields() {
        let raw = parse_mtab_line("/dev/sdc1 /mnt/usb\\040disk vfat rw 0 0").unwrap();
        assert_eq!(raw.mount_dir, "/mnt/usb disk");
    }

    #[test]
    fn parse_mtab_line_defaults_missing_fields() {
        let raw = parse_mtab_line("none /sys").unwrap();
        assert_eq!(raw.fs_type, "");
        assert_eq!(raw.options, "");
    }

    #[test]
    fn parse_skips_comments_blank_and_short_lines() {
        assert!(parse_mtab_line("# comment").is_none());
        assert!(parse_mtab_line("   \n").is_none());
        assert!(parse_mtab_line("lonely").is_none());
    }

    #[test]
    fn parse_mnttab_line_uses_tabs_and_ignore_option() {
        let raw =
            parse_mnttab_line("/dev/dsk/c0t0d0s0\t/\tufs\trw,intr,largefiles,dev=2200008\t1381820000\n")
                .unwrap();
        assert_eq!(raw.device_name, "/dev/dsk/c0t0d0s0");
        assert_eq!(raw.options, "rw,intr,largefiles,dev=2200008");
        assert_eq!(raw.dummy, Some(false));

        let raw = parse_mnttab_line("proc\t/proc\tproc\trw,ignore\t0").unwrap();
        assert_eq!(raw.dummy, Some(true));
    }

    #[test]
    fn table_entries_stream_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "/dev/sda1 / ext4 rw 0 0").unwrap();
        writeln!(file, "# skipped").unwrap();
        writeln!(file, "tmpfs /tmp tmpfs rw 0 0").unwrap();

        let source = TableSource::new(file.path());
        let dirs: Vec<String> = source
            .fetch_raw_entries()
            .unwrap()
            .map(|r| r.unwrap().mount_dir)
            .collect();
        assert_eq!(dirs, vec!["/", "/tmp"]);
    }

    #[test]
    fn non_utf8_line_is_kept_with_replacement() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"/dev/sdb1 /mnt/caf\xe9 ext4 ro 0 0\n").unwrap();
        writeln!(file, "/dev/sda1 / ext4 rw 0 0").unwrap();

        let entries: Vec<RawMount> = TableSource::new(file.path())
            .fetch_raw_entries()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].mount_dir, "/mnt/caf\u{fffd}");
        assert_eq!(entries[1].mount_dir, "/");
    }

    #[test]
    fn from_config_reads_configured_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tmpfs /run tmpfs rw 0 0").unwrap();

        let config = SourceConfig::new().with_table_path(file.path());
        let source = TableSource::from_config(&config);
        assert_eq!(source.path(), file.path());
        assert_eq!(source.fetch_raw_entries().unwrap().count(), 1);

        let source = TableSource::from_config(&SourceConfig::new());
        assert_eq!(source.path(), Path::new(DEFAULT_MTAB));
    }

    #[test]
    fn missing_table_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = TableSource::new(dir.path().join("mtab"));
        let err = source.fetch_raw_entries().unwrap_err();
        assert_eq!(err.kind(), rofs_error::MountListErrorKind::SourceUnavailable);
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn read_error_mid_stream_is_source_failed() {
        // Reading a directory opens fine but fails on the first read.
        let dir = tempfile::tempdir().unwrap();
        let mut entries = TableSource::new(dir.path()).fetch_raw_entries().unwrap();
        let err = entries.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), rofs_error::MountListErrorKind::SourceFailed);
        assert!(entries.next().is_none());
    }
}
