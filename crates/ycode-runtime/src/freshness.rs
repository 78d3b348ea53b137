use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use ycode_core::{Result, YcodeError};

#[derive(Debug, Default, Clone, Copy)]
struct FreshnessRecord {
    read_at_mtime: Option<SystemTime>,
    next_offset: Option<u64>,
}

/// Refuses writes to files that changed on disk since the agent last read them,
/// and appends that land anywhere but the expected offset.
#[derive(Default)]
pub struct FreshnessGuard {
    records: Mutex<HashMap<PathBuf, FreshnessRecord>>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl FreshnessGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the file's modification time as of now.
    pub fn mark_read(&self, path: &Path) {
        let mtime = modified(path);
        debug!(path = %path.display(), "marked read");
        self.records
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .read_at_mtime = mtime;
    }

    /// A file that does not exist is always fresh.
    pub fn assert_fresh(&self, path: &Path) -> Result<()> {
        let Some(current) = modified(path) else {
            return Ok(());
        };
        let records = self.records.lock();
        match records.get(path).and_then(|r| r.read_at_mtime) {
            None => Err(YcodeError::stale(
                path,
                "file has not been read yet; read it before modifying",
            )),
            Some(seen) if current > seen => Err(YcodeError::stale(
                path,
                "file changed on disk since it was last read; read it again before modifying",
            )),
            Some(_) => Ok(()),
        }
    }

    /// The next chunk must start at the recorded offset, or at the current
    /// end of file when nothing is recorded.
    pub fn assert_write_offset(&self, path: &Path, offset: u64) -> Result<()> {
        let expected = match self.records.lock().get(path).and_then(|r| r.next_offset) {
            Some(expected) => expected,
            None => std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        };
        if offset != expected {
            return Err(YcodeError::stale(
                path,
                format!("write offset {offset} does not match expected offset {expected}"),
            ));
        }
        Ok(())
    }

    pub fn advance_write_offset(&self, path: &Path, written: u64) {
        let mut records = self.records.lock();
        let record = records.entry(path.to_path_buf()).or_default();
        let base = match record.next_offset {
            Some(offset) => offset,
            None => std::fs::metadata(path)
                .map(|m| m.len().saturating_sub(written))
                .unwrap_or(0),
        };
        record.next_offset = Some(base + written);
    }

    pub fn reset_write_offset(&self, path: &Path) {
        if let Some(record) = self.records.lock().get_mut(path) {
            record.next_offset = None;
        }
    }

    pub fn expected_offset(&self, path: &Path) -> Option<u64> {
        self.records.lock().get(path).and_then(|r| r.next_offset)
    }
}
