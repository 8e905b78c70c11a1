//! Serializes every filesystem touch made by the history writer.
//!
//! Waiters on a `tokio::sync::Mutex` are woken in FIFO order, so concurrent
//! flushes and fight-log appends complete in the order they asked for the
//! lock. File operations hang off the guard, which makes it impossible to
//! write without holding the lock. Dropping the guard releases it on every
//! path, including early `?` returns.

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::StorageError;

#[derive(Debug, Default)]
struct CreatedDirs {
    seen: HashSet<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct IoLock {
    inner: Arc<Mutex<CreatedDirs>>,
}

pub struct IoGuard<'a> {
    dirs: MutexGuard<'a, CreatedDirs>,
}

impl IoLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> IoGuard<'_> {
        IoGuard {
            dirs: self.inner.lock().await,
        }
    }
}

impl IoGuard<'_> {
    /// Create `dir` (and parents) unless this lock already created it.
    pub async fn ensure_dir(&mut self, dir: &Path) -> Result<(), StorageError> {
        if self.dirs.seen.contains(dir) {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        self.dirs.seen.insert(dir.to_path_buf());
        Ok(())
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &mut self,
        path: &Path,
        value: &T,
    ) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    pub async fn append(&mut self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(io_err)?;
        file.write_all(bytes).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)
    }

    pub fn has_created(&self, dir: &Path) -> bool {
        self.dirs.seen.contains(dir)
    }
}
