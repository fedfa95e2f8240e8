//! Normalized mount records and the list that carries them.

use crate::classify::{is_readonly, Classifier};
use crate::source::{DeviceHint, RawMount};

/// One mounted filesystem as observed at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device_name: String,
    pub mount_dir: String,
    /// Empty when the source could not tell.
    pub fs_type: String,
    pub options: String,
    pub is_dummy: bool,
    pub is_remote: bool,
    pub is_readonly: bool,
    pub device_id: Option<u64>,
}

impl MountEntry {
    /// Builds an entry from a raw record; values supplied by the source win
    /// over the classifier's derivation.
    pub fn classify(raw: RawMount, classifier: &Classifier) -> Self {
        let is_dummy = raw
            .dummy
            .unwrap_or_else(|| classifier.is_dummy(&raw.fs_type, &raw.options));
        let is_remote = raw
            .remote
            .unwrap_or_else(|| classifier.is_remote(&raw.device_name, &raw.fs_type));
        let is_readonly = raw.readonly.unwrap_or_else(|| is_readonly(&raw.options));
        let device_id = match raw.device {
            DeviceHint::Known(id) => Some(id),
            DeviceHint::Unknown => None,
            DeviceHint::FromOptions => classifier.device_id(&raw.options),
        };

        Self {
            device_name: raw.device_name,
            mount_dir: raw.mount_dir,
            fs_type: raw.fs_type,
            options: raw.options,
            is_dummy,
            is_remote,
            is_readonly,
            device_id,
        }
    }
}

/// Mount entries in the order the OS reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountList {
    entries: Vec<MountEntry>,
}

impl MountList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MountEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// Every entry mounted exactly at `dir` (stacked mounts yield several).
    pub fn find_by_mount_dir<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a MountEntry> {
        self.entries.iter().filter(move |e| e.mount_dir == dir)
    }
}

impl IntoIterator for MountList {
    type Item = MountEntry;
    type IntoIter = std::vec::IntoIter<MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a MountList {
    type Item = &'a MountEntry;
    type IntoIter = std::slice::Iter<'a, MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Append-only accumulator finalized into a [`MountList`].
///
/// Dropping an unfinished builder discards everything pushed so far.
#[derive(Debug)]
pub struct MountListBuilder<'c> {
    classifier: &'c Classifier,
    entries: Vec<MountEntry>,
}

impl<'c> MountListBuilder<'c> {
    pub fn new(classifier: &'c Classifier) -> Self {
        Self {
            classifier,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, raw: RawMount) {
        self.entries.push(MountEntry::classify(raw, self.classifier));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> MountList {
        MountList {
            entries: self.entries,
        }
    }
}
