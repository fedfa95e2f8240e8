//! Filtering and verdicts over a mount list.

use rofs_mountlist::{MountEntry, MountList};

/// Monitoring plugin states and their exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl ServiceState {
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// Which entries take part in the check.
#[derive(Debug, Clone, Default)]
pub struct FsFilter {
    pub select_types: Vec<String>,
    pub exclude_types: Vec<String>,
    pub local_only: bool,
}

impl FsFilter {
    /// First type that is both selected and excluded.
    pub fn conflicting_type(&self) -> Option<&str> {
        self.select_types
            .iter()
            .find(|t| self.exclude_types.contains(t))
            .map(String::as_str)
    }

    /// Filtering on type or locality needs reliable type fields.
    pub fn needs_fs_type(&self) -> bool {
        !self.select_types.is_empty() || !self.exclude_types.is_empty() || self.local_only
    }

    /// An entry with no known type is never filtered on type.
    pub fn accepts(&self, entry: &MountEntry) -> bool {
        if self.local_only && entry.is_remote {
            return false;
        }
        let fs_type = entry.fs_type.as_str();
        if fs_type.is_empty() {
            return true;
        }
        if self.exclude_types.iter().any(|t| t == fs_type) {
            return false;
        }
        self.select_types.is_empty() || self.select_types.iter().any(|t| t == fs_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub state: ServiceState,
    /// Mount points (or requested names) found read-only, in list order.
    pub readonly: Vec<String>,
    /// One line per checked entry, for `--list`.
    pub listing: Vec<String>,
}

impl CheckReport {
    fn new() -> Self {
        Self {
            state: ServiceState::Ok,
            readonly: Vec::new(),
            listing: Vec::new(),
        }
    }

    fn record(&mut self, entry: &MountEntry) {
        self.listing.push(listing_line(entry));
    }

    fn flag_readonly(&mut self, name: &str) {
        self.state = ServiceState::Critical;
        self.readonly.push(name.to_string());
    }

    /// The plugin result line.
    pub fn summary(&self) -> String {
        match self.state {
            ServiceState::Ok => "FILESYSTEMS OK".to_string(),
            _ => format!("FILESYSTEMS CRITICAL: {} readonly!", self.readonly.join(",")),
        }
    }
}

pub fn listing_line(entry: &MountEntry) -> String {
    format!(
        "{}  ({}) {}",
        entry.mount_dir,
        entry.fs_type,
        if entry.is_readonly {
            " *** readonly! ***"
        } else {
            ""
        }
    )
}

/// Checks every accepted entry.
pub fn check_all(list: &MountList, filter: &FsFilter) -> CheckReport {
    let mut report = CheckReport::new();
    for entry in list.iter().filter(|e| filter.accepts(e)) {
        report.record(entry);
        if entry.is_readonly {
            report.flag_readonly(&entry.mount_dir);
        }
    }
    report
}

/// Checks only the entries mounted at one of `names`.
///
/// A name counts as read-only if any accepted entry mounted there is.
pub fn check_listed(list: &MountList, names: &[String], filter: &FsFilter) -> CheckReport {
    let mut report = CheckReport::new();
    for name in names {
        let mut readonly = false;
        for entry in list.find_by_mount_dir(name).filter(|e| filter.accepts(e)) {
            report.record(entry);
            readonly |= entry.is_readonly;
        }
        if readonly {
            report.flag_readonly(name);
        }
    }
    report
}
