//! SVR4 `mnttab` reader serialized by a shared advisory lock.

use super::table::{parse_mnttab_line, TableEntries};
use super::MountSource;
use crate::config::{SourceConfig, DEFAULT_MNTTAB, DEFAULT_MNTTAB_LOCK};
use crate::guards::LockGuard;
use rofs_error::MountListResult;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LockedTableSource {
    table_path: PathBuf,
    lock_path: PathBuf,
    location: String,
}

impl LockedTableSource {
    pub fn new(table_path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        let table_path = table_path.into();
        let location = table_path.display().to_string();
        Self {
            table_path,
            lock_path: lock_path.into(),
            location,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(
            config.table_path_or(DEFAULT_MNTTAB),
            config.lock_path_or(DEFAULT_MNTTAB_LOCK),
        )
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl MountSource for LockedTableSource {
    type Entries = TableEntries;

    fn name(&self) -> &str {
        &self.location
    }

    fn fetch_raw_entries(&self) -> MountListResult<TableEntries> {
        // On open failure the guard drops here, releasing the lock.
        let lock = LockGuard::acquire_shared(&self.lock_path)?;
        TableEntries::open(&self.table_path, parse_mnttab_line, lock)
    }
}
