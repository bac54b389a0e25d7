//! Per-file execution locks
//!
//! Two requests targeting the same declaration file must not interleave their
//! rewrite and recreate steps. Requests for different files run in parallel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Registry of one mutex per declaration file
///
/// Entries live only while a caller holds or waits for them, so the map
/// stays as small as the number of files being deployed at once.
#[derive(Debug, Default)]
pub struct FileLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `path`, blocking until it is free
    ///
    /// Paths are canonicalized when possible so `a/../a/x.yml` and `a/x.yml`
    /// share a lock. A poisoned lock is taken over: the file on disk is the
    /// only state it protects.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.clone()).or_default().clone()
        };

        debug!("Waiting for lock on {}", path.display());
        let result = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };

        // Drop the entry once nobody else holds or waits for it
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }

        result
    }

    /// Number of files currently locked or awaited
    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
