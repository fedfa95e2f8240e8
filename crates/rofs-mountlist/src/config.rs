//! Platform overrides for the mount sources, read from the environment.

use std::env;
use std::path::{Path, PathBuf};

pub const MOUNT_TABLE_ENV: &str = "ROFS_MOUNT_TABLE";
pub const MNTTAB_LOCK_ENV: &str = "ROFS_MNTTAB_LOCK";
pub const EXTRA_PSEUDO_FS_ENV: &str = "ROFS_EXTRA_PSEUDO_FS";

pub const DEFAULT_MTAB: &str = "/etc/mtab";
pub const DEFAULT_MNTTAB: &str = "/etc/mnttab";
pub const DEFAULT_MNTTAB_LOCK: &str = "/etc/.mnttab.lock";
pub const DEFAULT_MOUNTINFO: &str = "/proc/self/mountinfo";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    /// Mount table path; `None` means the adapter's own default.
    pub table_path: Option<PathBuf>,
    pub lock_path: Option<PathBuf>,
    pub extra_pseudo_types: Vec<String>,
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            table_path: get(MOUNT_TABLE_ENV).map(PathBuf::from),
            lock_path: get(MNTTAB_LOCK_ENV).map(PathBuf::from),
            extra_pseudo_types: get(EXTRA_PSEUDO_FS_ENV)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn with_table_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.table_path = Some(path.into());
        self
    }

    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    pub fn with_extra_pseudo_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_pseudo_types
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn table_path_or<'a>(&'a self, default: &'a str) -> &'a Path {
        self.table_path
            .as_deref()
            .unwrap_or_else(|| Path::new(default))
    }

    pub fn lock_path_or<'a>(&'a self, default: &'a str) -> &'a Path {
        self.lock_path
            .as_deref()
            .unwrap_or_else(|| Path::new(default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_lookup_uses_adapter_defaults() {
        let config = SourceConfig::from_lookup(lookup(&[]));
        assert_eq!(config, SourceConfig::default());
        assert_eq!(config.table_path_or(DEFAULT_MTAB), Path::new("/etc/mtab"));
        assert_eq!(
            config.lock_path_or(DEFAULT_MNTTAB_LOCK),
            Path::new("/etc/.mnttab.lock")
        );
    }

    #[test]
    fn setters_override_each_field() {
        let config = SourceConfig::new()
            .with_table_path("/tmp/mnttab")
            .with_lock_path("/tmp/.mnttab.lock")
            .with_extra_pseudo_types(["overlay"])
            .with_extra_pseudo_types(vec![String::from("squashfs")]);
        assert_eq!(config.table_path_or(DEFAULT_MNTTAB), Path::new("/tmp/mnttab"));
        assert_eq!(
            config.lock_path_or(DEFAULT_MNTTAB_LOCK),
            Path::new("/tmp/.mnttab.lock")
        );
        assert_eq!(config.extra_pseudo_types, vec!["overlay", "squashfs"]);
    }

    #[test]
    fn overrides_are_read_and_empty_values_ignored() {
        let config = SourceConfig::from_lookup(lookup(&[
            (MOUNT_TABLE_ENV, "/tmp/mtab"),
            (MNTTAB_LOCK_ENV, "  "),
            (EXTRA_PSEUDO_FS_ENV, "overlay, squashfs,,"),
        ]));
        assert_eq!(config.table_path_or(DEFAULT_MTAB), Path::new("/tmp/mtab"));
        assert_eq!(config.lock_path, None);
        assert_eq!(config.extra_pseudo_types, vec!["overlay", "squashfs"]);
    }
}
