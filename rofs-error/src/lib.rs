use nix::errno::Errno;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type MountListResult<T> = Result<T, MountListError>;

/// Terminal failures of a single mount-list read.
#[derive(Error, Debug)]
pub enum MountListError {
    /// The mount facility could not be opened or queried; nothing was read.
    #[error("cannot open mount source {location}: {err}")]
    SourceUnavailable {
        location: String,
        #[source]
        err: io::Error,
    },

    /// The query started but ended in error; partial data was discarded.
    #[error("reading mount source {location} failed after {entries_read} entries: {err}")]
    SourceFailed {
        location: String,
        entries_read: usize,
        #[source]
        err: io::Error,
    },

    #[error("malformed mount record at offset {offset}: {reason}")]
    MalformedRecord { offset: usize, reason: String },

    #[error("cannot lock {}: {errno}", path.display())]
    LockAcquisitionFailed { path: PathBuf, errno: Errno },
}

/// Fieldless mirror of [`MountListError`] for logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountListErrorKind {
    SourceUnavailable,
    SourceFailed,
    MalformedRecord,
    LockAcquisitionFailed,
}

impl MountListError {
    pub fn unavailable(location: impl Into<String>, err: io::Error) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            err,
        }
    }

    pub fn failed(location: impl Into<String>, entries_read: usize, err: io::Error) -> Self {
        Self::SourceFailed {
            location: location.into(),
            entries_read,
            err,
        }
    }

    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            offset,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> MountListErrorKind {
        match self {
            Self::SourceUnavailable { .. } => MountListErrorKind::SourceUnavailable,
            Self::SourceFailed { .. } => MountListErrorKind::SourceFailed,
            Self::MalformedRecord { .. } => MountListErrorKind::MalformedRecord,
            Self::LockAcquisitionFailed { .. } => MountListErrorKind::LockAcquisitionFailed,
        }
    }

    /// The underlying OS error code, when the failure carries one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::SourceUnavailable { err, .. } | Self::SourceFailed { err, .. } => {
                err.raw_os_error()
            }
            Self::LockAcquisitionFailed { errno, .. } => Some(*errno as i32),
            Self::MalformedRecord { .. } => None,
        }
    }
}
