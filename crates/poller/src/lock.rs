//! Host-wide singleton lock for the polling role.
//!
//! The lock is an exclusive, non-blocking `flock` on a marker file. The
//! kernel drops the lock when the holding process exits, so a crashed
//! poller never leaves the role taken; a leftover marker file on its own
//! never blocks a new holder.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the marker in the system temp directory.
pub const DEFAULT_LOCK_FILE: &str = "licmon.lock";

/// Error type for lock acquisition.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another holder owns the lock.
    #[error("Poller lock {} is held by another process", .0.display())]
    Busy(PathBuf),

    #[error("Poller lock I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The lock location. Acquiring yields a [`LockHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingletonLock {
    path: PathBuf,
}

impl Default for SingletonLock {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(DEFAULT_LOCK_FILE))
    }
}

impl SingletonLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock without blocking.
    ///
    /// Returns [`LockError::Busy`] at once when another handle holds it.
    /// On success the holder's PID is written into the marker.
    pub fn acquire(&self) -> Result<LockHandle, LockError> {
        let mut file = sys::lock_marker(&self.path)?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        tracing::debug!(path = %self.path.display(), "Poller lock acquired");
        Ok(LockHandle {
            path: self.path.clone(),
            file: Some(file),
        })
    }
}

/// Proof of holding the polling role. Dropping it releases the lock.
#[derive(Debug)]
pub struct LockHandle {
    path: PathBuf,
    file: Option<File>,
}

impl LockHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the marker and unlock.
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        // Remove while still locked, so a waiter that opened the old file
        // notices the unlink and reopens.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove lock marker");
            }
        }
        sys::unlock(file);
        tracing::debug!(path = %self.path.display(), "Poller lock released");
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.unlock();
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod sys {
    use std::fs::File;
    use std::io;
    use std::os::unix::fs::MetadataExt;
    use std::os::unix::io::AsRawFd;
    use std::path::Path;

    use super::{LockError, OpenOptions};

    /// Open the marker and take an exclusive non-blocking `flock` on it,
    /// retrying when the locked file was unlinked by a releasing holder.
    pub(super) fn lock_marker(path: &Path) -> Result<File, LockError> {
        loop {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;

            // Safety: the descriptor is owned by `file` and open.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
            if rc != 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    return Err(LockError::Busy(path.to_path_buf()));
                }
                return Err(err.into());
            }

            let locked = file.metadata()?;
            match std::fs::metadata(path) {
                Ok(current) if current.dev() == locked.dev() && current.ino() == locked.ino() => {
                    return Ok(file);
                }
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub(super) fn unlock(file: File) {
        // Safety: the descriptor is owned by `file` and open.
        unsafe {
            libc::flock(file.as_raw_fd(), libc::LOCK_UN);
        }
        drop(file);
    }
}

#[cfg(not(unix))]
mod sys {
    use std::fs::File;
    use std::io;
    use std::path::Path;

    use super::{LockError, OpenOptions};

    /// Exclusive creation of the marker. Without `flock` a crashed holder
    /// leaves the marker behind and it has to be removed by hand.
    pub(super) fn lock_marker(path: &Path) -> Result<File, LockError> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(LockError::Busy(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(super) fn unlock(file: File) {
        drop(file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_path_is_in_temp_dir() {
        let lock = SingletonLock::default();
        assert_eq!(lock.path(), std::env::temp_dir().join("licmon.lock"));
    }

    #[test]
    fn marker_holds_pid_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let lock = SingletonLock::new(dir.path().join("poller.lock"));

        let handle = lock.acquire().unwrap();
        let contents = std::fs::read_to_string(handle.path()).unwrap();
        assert_eq!(contents.trim(), std::process::id().to_string());

        handle.release();
        assert!(!lock.path().exists());
    }

    #[test]
    fn busy_error_names_the_path() {
        let err = LockError::Busy(PathBuf::from("/tmp/licmon.lock"));
        assert_eq!(
            err.to_string(),
            "Poller lock /tmp/licmon.lock is held by another process"
        );
        assert_matches!(err, LockError::Busy(_));
    }
}
