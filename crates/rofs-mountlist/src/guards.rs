use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};
use rofs_error::{MountListError, MountListResult};
use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

/// Upper bound on `EINTR` retries while waiting for the advisory lock.
pub const MAX_LOCK_ATTEMPTS: usize = 16;

/// RAII guard holding a shared advisory lock on a lock file.
///
/// The lock is dropped with the descriptor; the explicit unlock only makes
/// the release visible in logs.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl LockGuard {
    /// Blocks until a shared lock on `path` is held.
    ///
    /// A missing lock file yields `Ok(None)`: readers proceed unlocked.
    pub fn acquire_shared(path: &Path) -> MountListResult<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                let errno = Errno::from_raw(err.raw_os_error().unwrap_or(libc::EIO));
                if errno == Errno::ENOENT {
                    log::debug!("lock file {} absent; reading unlocked", path.display());
                    return Ok(None);
                }
                return Err(lock_failed(path, errno));
            }
        };

        let request = flock_request(libc::F_RDLCK as libc::c_short);
        retry_interrupted(MAX_LOCK_ATTEMPTS, || {
            fcntl(file.as_raw_fd(), FcntlArg::F_SETLKW(&request))
        })
        .map_err(|errno| lock_failed(path, errno))?;

        log::debug!("acquired shared lock on {}", path.display());
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let request = flock_request(libc::F_UNLCK as libc::c_short);
        if let Err(err) = fcntl(self.file.as_raw_fd(), FcntlArg::F_SETLK(&request)) {
            log::warn!("failed to release lock on {}: {}", self.path.display(), err);
        } else {
            log::debug!("released lock on {}", self.path.display());
        }
    }
}

fn lock_failed(path: &Path, errno: Errno) -> MountListError {
    MountListError::LockAcquisitionFailed {
        path: path.to_path_buf(),
        errno,
    }
}

/// Whole-file lock request of the given type.
fn flock_request(lock_type: libc::c_short) -> libc::flock {
    // SAFETY: `flock` is plain old data; all-zero is a valid value and the
    // fields that matter are set below.
    let mut request: libc::flock = unsafe { std::mem::zeroed() };
    request.l_type = lock_type;
    request.l_whence = libc::SEEK_SET as libc::c_short;
    request.l_start = 0;
    request.l_len = 0;
    request
}

/// Runs `op`, retrying while it reports `EINTR`, at most `max_attempts` times.
pub(crate) fn retry_interrupted<T>(
    max_attempts: usize,
    mut op: impl FnMut() -> nix::Result<T>,
) -> nix::Result<T> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match op() {
            Err(Errno::EINTR) if attempts < max_attempts => {
                log::debug!("lock wait interrupted (attempt {attempts}); retrying");
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rofs_error::MountListErrorKind;

    #[test]
    fn missing_lock_file_proceeds_unlocked() {
        let dir = tempfile::tempdir().unwrap();
        let guard = LockGuard::acquire_shared(&dir.path().join(".mnttab.lock")).unwrap();
        assert!(guard.is_none());
    }

    #[test]
    fn existing_lock_file_is_locked_and_released() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let guard = LockGuard::acquire_shared(file.path()).unwrap();
        let guard = guard.expect("lock should be taken");
        assert_eq!(guard.path(), file.path());
        drop(guard);

        // Shared locks stack, and a released one can be re-taken.
        let first = LockGuard::acquire_shared(file.path()).unwrap();
        let second = LockGuard::acquire_shared(file.path()).unwrap();
        assert!(first.is_some() && second.is_some());
    }

    #[test]
    fn unopenable_lock_file_is_hard_failure() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A path below a regular file fails with ENOTDIR, not ENOENT.
        let err = LockGuard::acquire_shared(&file.path().join("lock")).unwrap_err();
        assert_eq!(err.kind(), MountListErrorKind::LockAcquisitionFailed);
        assert_eq!(err.raw_os_error(), Some(Errno::ENOTDIR as i32));
    }

    #[test]
    fn interrupted_lock_wait_is_retried() {
        let mut calls = 0;
        let result = retry_interrupted(MAX_LOCK_ATTEMPTS, || {
            calls += 1;
            if calls < 3 {
                Err(Errno::EINTR)
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn interrupt_retries_are_bounded() {
        let mut calls = 0;
        let result: nix::Result<()> = retry_interrupted(4, || {
            calls += 1;
            Err(Errno::EINTR)
        });
        assert_eq!(result, Err(Errno::EINTR));
        assert_eq!(calls, 4);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let mut calls = 0;
        let result: nix::Result<()> = retry_interrupted(MAX_LOCK_ATTEMPTS, || {
            calls += 1;
            Err(Errno::EBADF)
        });
        assert_eq!(result, Err(Errno::EBADF));
        assert_eq!(calls, 1);
    }
}
