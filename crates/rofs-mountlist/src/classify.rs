//! Pure classification helpers for raw mount records.
//!
//! The name tables are plain data so a target can extend them without
//! touching the callers; [`Classifier`] owns the effective set.

/// Virtual filesystems with no backing store, on every target.
pub const PSEUDO_FS_TYPES: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "devpts",
    "fusectl",
    "none",
    "proc",
    "subfs",
    // NetBSD
    "kernfs",
    // Irix
    "ignore",
];

#[cfg(target_os = "linux")]
pub const PLATFORM_PSEUDO_FS_TYPES: &[&str] = &[
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devtmpfs",
    "efivarfs",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "pstore",
    "rpc_pipefs",
    "securityfs",
    "sysfs",
    "tracefs",
];

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
pub const PLATFORM_PSEUDO_FS_TYPES: &[&str] = &["devfs", "fdescfs", "linprocfs", "procfs"];

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub const PLATFORM_PSEUDO_FS_TYPES: &[&str] = &["devfs", "nullfs"];

#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios"
)))]
pub const PLATFORM_PSEUDO_FS_TYPES: &[&str] = &[];

/// Network share types recognised behind a `//server/share` device name.
pub const NETWORK_SHARE_FS_TYPES: &[&str] = &["smbfs", "cifs"];

/// Mount option that marks an entry as not worth reporting.
pub const IGNORE_OPTION: &str = "ignore";

const READONLY_OPTION: &str = "ro";
const DEV_OPTION_PATTERN: &str = ",dev=";

/// True if `name` is a complete comma-separated token of `options`.
pub fn has_option(options: &str, name: &str) -> bool {
    options.split(',').any(|token| token == name)
}

pub fn is_readonly(options: &str) -> bool {
    has_option(options, READONLY_OPTION)
}

/// Parses the hex value of the first `,dev=` fragment in `options`.
///
/// Returns `None` unless the whole value up to the next comma (or the end)
/// is valid hex that fits in a `u64`.
pub fn extract_device_id(options: &str) -> Option<u64> {
    let start = options.find(DEV_OPTION_PATTERN)? + DEV_OPTION_PATTERN.len();
    let rest = &options[start..];
    let value = rest.split(',').next().unwrap_or_default();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Classification policy: which names count as pseudo or network shares and
/// whether `dev=` options are believed.
#[derive(Debug, Clone)]
pub struct Classifier {
    pseudo_types: Vec<String>,
    network_share_types: Vec<String>,
    trust_dev_option: bool,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::for_host()
    }
}

impl Classifier {
    /// Tables and policy for the compiled-in target.
    ///
    /// Linux lets each filesystem define its own meaning for `dev=`, so the
    /// option is not trusted there.
    pub fn for_host() -> Self {
        Self::from_tables(
            PSEUDO_FS_TYPES.iter().chain(PLATFORM_PSEUDO_FS_TYPES),
            NETWORK_SHARE_FS_TYPES,
        )
        .trust_dev_option(!cfg!(target_os = "linux"))
    }

    pub fn from_tables<'a, P, N>(pseudo_types: P, network_share_types: N) -> Self
    where
        P: IntoIterator<Item = &'a &'a str>,
        N: IntoIterator<Item = &'a &'a str>,
    {
        Self {
            pseudo_types: pseudo_types.into_iter().map(|s| s.to_string()).collect(),
            network_share_types: network_share_types
                .into_iter()
                .map(|s| s.to_string())
                .collect(),
            trust_dev_option: true,
        }
    }

    pub fn with_extra_pseudo_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !name.is_empty() && !self.pseudo_types.contains(&name) {
                self.pseudo_types.push(name);
            }
        }
        self
    }

    pub fn trust_dev_option(mut self, trust: bool) -> Self {
        self.trust_dev_option = trust;
        self
    }

    pub fn trusts_dev_option(&self) -> bool {
        self.trust_dev_option
    }

    /// Case-sensitive match against the pseudo filesystem table.
    pub fn is_pseudo(&self, fs_type: &str) -> bool {
        self.pseudo_types.iter().any(|t| t == fs_type)
    }

    pub fn is_dummy(&self, fs_type: &str, options: &str) -> bool {
        self.is_pseudo(fs_type) || has_option(options, IGNORE_OPTION)
    }

    /// `host:/path` specs, or `//server/share` with a network share type.
    pub fn is_remote(&self, device_name: &str, fs_type: &str) -> bool {
        device_name.contains(':')
            || (device_name.starts_with("//")
                && self.network_share_types.iter().any(|t| t == fs_type))
    }

    pub fn device_id(&self, options: &str) -> Option<u64> {
        if !self.trust_dev_option {
            return None;
        }
        extract_device_id(options)
    }
}
