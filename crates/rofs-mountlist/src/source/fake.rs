//! Fake mount source for testing.
//!
//! Serves canned records and records every open, emit and release, so
//! cleanup behaviour can be checked without touching the real mount table.

use super::{MountSource, RawMount};
use rofs_error::{MountListError, MountListResult};
use std::io;
use std::sync::{Arc, Mutex};

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Open,
    Emit { mount_dir: String },
    Release,
}

#[derive(Debug, Default)]
struct FakeSourceState {
    operations: Vec<Operation>,
}

/// Fake source that replays `entries`, optionally failing.
#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    entries: Vec<RawMount>,
    fail_open: Option<io::ErrorKind>,
    fail_after: Option<usize>,
    state: Arc<Mutex<FakeSourceState>>,
}

impl FakeSource {
    pub fn new(entries: Vec<RawMount>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Make `fetch_raw_entries` fail before anything is read.
    pub fn failing_open(mut self, kind: io::ErrorKind) -> Self {
        self.fail_open = Some(kind);
        self
    }

    /// Emit `n` records, then fail the stream.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn release_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| **op == Operation::Release)
            .count()
    }

    fn record(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }
}

impl MountSource for FakeSource {
    type Entries = FakeEntries;

    fn name(&self) -> &str {
        "fake"
    }

    fn fetch_raw_entries(&self) -> MountListResult<FakeEntries> {
        if let Some(kind) = self.fail_open {
            return Err(MountListError::unavailable(self.name(), io::Error::from(kind)));
        }
        self.record(Operation::Open);
        Ok(FakeEntries {
            source: self.clone(),
            pending: self.entries.clone().into_iter(),
            emitted: 0,
            failed: false,
        })
    }
}

/// Open handle of a [`FakeSource`]; logs `Release` when dropped.
#[derive(Debug)]
pub struct FakeEntries {
    source: FakeSource,
    pending: std::vec::IntoIter<RawMount>,
    emitted: usize,
    failed: bool,
}

impl Iterator for FakeEntries {
    type Item = MountListResult<RawMount>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if self.source.fail_after == Some(self.emitted) {
            self.failed = true;
            return Some(Err(MountListError::failed(
                self.source.name(),
                self.emitted,
                io::Error::from(io::ErrorKind::UnexpectedEof),
            )));
        }
        let raw = self.pending.next()?;
        self.emitted += 1;
        self.source.record(Operation::Emit {
            mount_dir: raw.mount_dir.clone(),
        });
        Some(Ok(raw))
    }
}

impl Drop for FakeEntries {
    fn drop(&mut self) {
        self.source.record(Operation::Release);
    }
}
