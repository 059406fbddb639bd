//! Advisory launch lock.

use crate::{GuardError, GuardResult};
use chrono::Utc;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive lock held around guard-check-and-launch. Released on drop, and by
/// the OS if the holder dies.
#[derive(Debug)]
pub struct LaunchLock {
    file: File,
    path: PathBuf,
}

impl LaunchLock {
    /// Block until the lock is available.
    pub fn acquire(path: &Path) -> GuardResult<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()?;
        Self::stamp(file, path)
    }

    /// Take the lock if free, otherwise fail with [`GuardError::LockBusy`].
    pub fn try_acquire(path: &Path) -> GuardResult<Self> {
        let file = open_lock_file(path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(GuardError::LockBusy {
                path: path.display().to_string(),
            });
        }
        Self::stamp(file, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stamp(mut file: File, path: &Path) -> GuardResult<Self> {
        let metadata = format!(
            "owner_pid={}\nacquired_at={}\n",
            std::process::id(),
            Utc::now().to_rfc3339()
        );
        file.set_len(0)?;
        file.write_all(metadata.as_bytes())?;
        file.flush()?;

        debug!(path = %path.display(), "launch lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LaunchLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn open_lock_file(path: &Path) -> GuardResult<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}
