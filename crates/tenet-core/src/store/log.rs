//! Bounded append-only JSON log.
//!
//! Each log is one JSON array on disk. Appends run a read-modify-write under
//! the log's lock and replace the file atomically (write `.tmp`, then
//! rename), so readers never observe a partial record. A file that no longer
//! parses is moved to `<log>.corrupt` by the next append.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::StoreError;

/// A capped, FIFO-evicting JSON log of `T` records.
pub struct JsonLog<T> {
    path: PathBuf,
    capacity: usize,
    lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonLog<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one record. Returns how many old records were evicted.
    pub fn append(&self, record: T) -> Result<usize, StoreError> {
        self.append_all(vec![record])
    }

    /// Append records in order under a single lock acquisition.
    pub fn append_all(&self, records: Vec<T>) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.lock();
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(StoreError::Json(e)) => {
                self.set_aside_corrupt(&e);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Log unreadable, starting empty");
                Vec::new()
            }
        };
        entries.extend(records);

        let evicted = entries.len().saturating_sub(self.capacity);
        if evicted > 0 {
            entries.drain(..evicted);
            tracing::debug!(path = %self.path.display(), evicted, "Evicted oldest log entries");
        }

        write_atomic(&self.path, &entries)?;
        Ok(evicted)
    }

    /// Every record currently retained, oldest first.
    ///
    /// An unreadable or corrupt file reads as empty.
    pub fn read_all(&self) -> Vec<T> {
        let _guard = self.lock.lock();
        self.load_or_empty()
    }

    /// The `n` most recent records, oldest first.
    pub fn tail(&self, n: usize) -> Vec<T> {
        let mut entries = self.read_all();
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
        entries
    }

    fn load(&self) -> Result<Vec<T>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    /// Move an unparseable log to `<log>.corrupt` so the next write does
    /// not destroy it.
    fn set_aside_corrupt(&self, error: &serde_json::Error) {
        let corrupt = sibling(&self.path, ".corrupt");
        match fs::rename(&self.path, &corrupt) {
            Ok(()) => tracing::warn!(
                path = %self.path.display(),
                kept_as = %corrupt.display(),
                error = %error,
                "Corrupt log set aside, starting a new one"
            ),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Corrupt log could not be set aside and will be overwritten"
            ),
        }
    }

    fn load_or_empty(&self) -> Vec<T> {
        match self.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Log unreadable, treating as empty"
                );
                Vec::new()
            }
        }
    }
}

/// Serialize `value` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomic<V: Serialize + ?Sized>(path: &Path, value: &V) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = sibling(path, ".tmp");

    let written = fs::write(&tmp_path, json).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
