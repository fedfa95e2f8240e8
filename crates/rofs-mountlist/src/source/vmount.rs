//! Buffer-walking source over AIX `mntctl(MCTL_QUERY)`.
//!
//! The kernel fills one buffer with variable-length `struct vmount`
//! records; string fields live at per-record offsets. Every length and
//! offset is checked against the record and the buffer before use.

use super::{DeviceHint, MountSource, RawMount};
use crate::config::SourceConfig;
use rofs_error::{MountListError, MountListResult};

// <sys/vmount.h>, native byte order.
const VMT_LENGTH_OFFSET: usize = 4;
const VMT_FLAGS_OFFSET: usize = 28;
const VMT_GFSTYPE_OFFSET: usize = 32;
const VMT_DATA_OFFSET: usize = 36;
const VMT_DATA_COUNT: usize = 6;
/// Fixed part of a vmount record: header plus the `vmt_data` index.
pub const VMOUNT_HEADER_LEN: usize = VMT_DATA_OFFSET + VMT_DATA_COUNT * 4;

pub const VMT_OBJECT: usize = 0;
pub const VMT_STUB: usize = 1;
pub const VMT_HOSTNAME: usize = 3;
pub const VMT_ARGS: usize = 5;

pub const MNT_READONLY: u32 = 0x0001;
pub const MNT_REMOTE: u32 = 0x0008;

/// `vmt_gfstype` values and their filesystem names.
pub const GFS_TYPE_NAMES: &[(u32, &str)] = &[
    (0, "jfs2"),
    (1, "namefs"),
    (2, "nfs"),
    (3, "jfs"),
    (5, "cdrfs"),
    (6, "procfs"),
    (16, "sfs"),
    (17, "cachefs"),
    (18, "nfs3"),
    (19, "autofs"),
    (20, "poolfs"),
    (32, "vxfs"),
    (33, "vxodm"),
    (34, "udf"),
    (35, "nfs4"),
    (36, "rfs4"),
    (37, "cifs"),
    (38, "pmemfs"),
    (39, "ahafs"),
    (41, "stnfs"),
    (42, "asmfs"),
];

pub fn gfs_type_name(gfstype: u32) -> &'static str {
    GFS_TYPE_NAMES
        .iter()
        .find(|(id, _)| *id == gfstype)
        .map(|(_, name)| *name)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct BufferSource;

impl BufferSource {
    pub fn new() -> Self {
        Self
    }

    pub fn from_config(_config: &SourceConfig) -> Self {
        Self
    }
}

impl MountSource for BufferSource {
    type Entries = VmountEntries;

    fn name(&self) -> &str {
        "mntctl"
    }

    fn reliable_fs_type(&self) -> bool {
        false
    }

    fn fetch_raw_entries(&self) -> MountListResult<VmountEntries> {
        let (buf, count) =
            query_vmount_buffer().map_err(|err| MountListError::unavailable(self.name(), err))?;
        log::debug!("mntctl returned {count} records in {} bytes", buf.len());
        Ok(walk_vmount_buffer(buf, count))
    }
}

/// Walks `count` vmount records laid out back to back in `buf`.
pub fn walk_vmount_buffer(buf: Vec<u8>, count: usize) -> VmountEntries {
    VmountEntries {
        buf,
        offset: 0,
        remaining: count,
    }
}

/// Cursor over an owned vmount buffer. Stops after the first malformed
/// record.
#[derive(Debug)]
pub struct VmountEntries {
    buf: Vec<u8>,
    offset: usize,
    remaining: usize,
}

impl Iterator for VmountEntries {
    type Item = MountListResult<RawMount>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        match parse_vmount(&self.buf, self.offset) {
            Ok((raw, len)) => {
                self.offset += len;
                Some(Ok(raw))
            }
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }
}

/// Parses the record at `offset`, returning it with its length.
fn parse_vmount(buf: &[u8], offset: usize) -> MountListResult<(RawMount, usize)> {
    let header_end = offset
        .checked_add(VMOUNT_HEADER_LEN)
        .filter(|end| *end <= buf.len())
        .ok_or_else(|| MountListError::malformed(offset, "truncated vmount header"))?;
    let header = &buf[offset..header_end];

    let len = read_u32(header, VMT_LENGTH_OFFSET) as usize;
    if len < VMOUNT_HEADER_LEN {
        return Err(MountListError::malformed(
            offset,
            format!("record length {len} shorter than header"),
        ));
    }
    if len > buf.len() - offset {
        return Err(MountListError::malformed(
            offset,
            format!("record length {len} runs past buffer end"),
        ));
    }
    let record = &buf[offset..offset + len];

    let flags = read_u32(record, VMT_FLAGS_OFFSET);
    let gfstype = read_u32(record, VMT_GFSTYPE_OFFSET);
    let field = |index| {
        data_field(record, index).map_err(|reason| MountListError::malformed(offset, reason))
    };

    let object = field(VMT_OBJECT)?;
    let stub = field(VMT_STUB)?;
    let args = field(VMT_ARGS)?;
    let remote = flags & MNT_REMOTE != 0;
    let device_name = if remote {
        format!("{}:{}", field(VMT_HOSTNAME)?, object)
    } else {
        object
    };

    let mut raw = RawMount::new(device_name, stub, gfs_type_name(gfstype), args);
    raw.readonly = Some(flags & MNT_READONLY != 0);
    raw.remote = Some(remote);
    // vmt_fsid might identify the device, but nothing documents it.
    raw.device = DeviceHint::Unknown;
    Ok((raw, len))
}

/// Reads the NUL-terminated string of `vmt_data[index]`.
fn data_field(record: &[u8], index: usize) -> Result<String, String> {
    let at = VMT_DATA_OFFSET + index * 4;
    let off = read_u16(record, at) as usize;
    let size = read_u16(record, at + 2) as usize;
    if off < VMOUNT_HEADER_LEN || off + size > record.len() {
        return Err(format!(
            "data field {index} at {off}+{size} outside record of {} bytes",
            record.len()
        ));
    }
    let bytes = &record[off..off + size];
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_ne_bytes(word)
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    let mut half = [0u8; 2];
    half.copy_from_slice(&bytes[at..at + 2]);
    u16::from_ne_bytes(half)
}

#[cfg(target_os = "aix")]
extern "C" {
    fn mntctl(command: libc::c_int, size: libc::c_int, buffer: *mut libc::c_char) -> libc::c_int;
}

#[cfg(target_os = "aix")]
const MCTL_QUERY: libc::c_int = 2;

/// Size-then-fetch: ask for the buffer size, allocate once, fetch.
#[cfg(target_os = "aix")]
fn query_vmount_buffer() -> std::io::Result<(Vec<u8>, usize)> {
    let mut size: libc::c_int = 0;
    // SAFETY: the buffer is a single c_int and its size is passed along.
    let rc = unsafe {
        mntctl(
            MCTL_QUERY,
            std::mem::size_of::<libc::c_int>() as libc::c_int,
            (&mut size as *mut libc::c_int).cast(),
        )
    };
    if rc < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let mut buf = vec![0u8; size.max(0) as usize];
    // SAFETY: `buf` is exactly `size` writable bytes.
    let count = unsafe { mntctl(MCTL_QUERY, size, buf.as_mut_ptr().cast()) };
    if count < 0 {
        return Err(std::io::Error::last_os_error());
    }
    if count == 0 && size > 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "mount table grew between size query and fetch",
        ));
    }
    Ok((buf, count as usize))
}

#[cfg(not(target_os = "aix"))]
fn query_vmount_buffer() -> std::io::Result<(Vec<u8>, usize)> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "mntctl is not available on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rofs_error::MountListErrorKind;

    /// Builds one vmount record; `fields` is indexed like `vmt_data`.
    fn record(flags: u32, gfstype: u32, fields: [&str; VMT_DATA_COUNT]) -> Vec<u8> {
        let mut data = Vec::new();
        let mut index = Vec::new();
        for field in fields {
            let off = VMOUNT_HEADER_LEN + data.len();
            data.extend_from_slice(field.as_bytes());
            data.push(0);
            index.push((off as u16, field.len() as u16 + 1));
        }
        let len = (VMOUNT_HEADER_LEN + data.len()) as u32;

        let mut rec = Vec::new();
        rec.extend_from_slice(&1u32.to_ne_bytes()); // revision
        rec.extend_from_slice(&len.to_ne_bytes());
        rec.extend_from_slice(&[0u8; 8]); // fsid
        rec.extend_from_slice(&[0u8; 12]); // vfsnumber, time, timepad
        rec.extend_from_slice(&flags.to_ne_bytes());
        rec.extend_from_slice(&gfstype.to_ne_bytes());
        for (off, size) in index {
            rec.extend_from_slice(&off.to_ne_bytes());
            rec.extend_from_slice(&size.to_ne_bytes());
        }
        assert_eq!(rec.len(), VMOUNT_HEADER_LEN);
        rec.extend_from_slice(&data);
        rec
    }

    fn set_length(rec: &mut [u8], len: u32) {
        rec[VMT_LENGTH_OFFSET..VMT_LENGTH_OFFSET + 4].copy_from_slice(&len.to_ne_bytes());
    }

    #[test]
    fn walks_consecutive_records() {
        let mut buf = record(0, 0, ["/dev/hd4", "/", "", "", "", "rw,log=/dev/hd8"]);
        buf.extend(record(
            MNT_READONLY | MNT_REMOTE,
            2,
            ["/export/home", "/home", "", "nas01", "", "ro,bg,hard"],
        ));

        let entries: Vec<RawMount> = walk_vmount_buffer(buf, 2)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].device_name, "/dev/hd4");
        assert_eq!(entries[0].fs_type, "jfs2");
        assert_eq!(entries[0].readonly, Some(false));
        assert_eq!(entries[1].device_name, "nas01:/export/home");
        assert_eq!(entries[1].mount_dir, "/home");
        assert_eq!(entries[1].fs_type, "nfs");
        assert_eq!(entries[1].remote, Some(true));
        assert_eq!(entries[1].readonly, Some(true));
        assert_eq!(entries[1].device, DeviceHint::Unknown);
    }

    #[test]
    fn unknown_gfstype_leaves_type_empty() {
        let buf = record(0, 99, ["/dev/lv00", "/opt", "", "", "", "rw"]);
        let raw = walk_vmount_buffer(buf, 1).next().unwrap().unwrap();
        assert_eq!(raw.fs_type, "");
    }

    #[test]
    fn length_past_buffer_end_is_malformed() {
        let mut buf = record(0, 0, ["/dev/hd4", "/", "", "", "", "rw"]);
        let too_long = buf.len() as u32 + 1;
        set_length(&mut buf, too_long);
        let err = walk_vmount_buffer(buf, 1).next().unwrap().unwrap_err();
        assert_eq!(err.kind(), MountListErrorKind::MalformedRecord);
    }

    #[test]
    fn zero_length_record_is_malformed_not_a_loop() {
        let mut buf = record(0, 0, ["/dev/hd4", "/", "", "", "", "rw"]);
        set_length(&mut buf, 0);
        let mut entries = walk_vmount_buffer(buf, 3);
        assert!(entries.next().unwrap().is_err());
        assert!(entries.next().is_none());
    }

    #[test]
    fn count_beyond_buffer_is_malformed() {
        let buf = record(0, 0, ["/dev/hd4", "/", "", "", "", "rw"]);
        let results: Vec<_> = walk_vmount_buffer(buf, 2).collect();
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), MountListErrorKind::MalformedRecord);
    }

    #[test]
    fn data_offset_outside_record_is_malformed() {
        let mut buf = record(0, 0, ["/dev/hd4", "/", "", "", "", "rw"]);
        let at = VMT_DATA_OFFSET + VMT_STUB * 4;
        buf[at..at + 2].copy_from_slice(&0xfff0u16.to_ne_bytes());
        let err = walk_vmount_buffer(buf, 1).next().unwrap().unwrap_err();
        assert_eq!(err.kind(), MountListErrorKind::MalformedRecord);
    }

    #[cfg(not(target_os = "aix"))]
    #[test]
    fn unsupported_platform_is_unavailable() {
        let err = BufferSource::new().fetch_raw_entries().unwrap_err();
        assert_eq!(err.kind(), MountListErrorKind::SourceUnavailable);
    }
}
