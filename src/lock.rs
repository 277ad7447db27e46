//! Advisory file locks serialising concurrent ngsite invocations.
//!
//! Two kinds of lock exist: one per domain, held for the whole of an activation,
//! deactivation or sub-route append, and one global lock held around every
//! validate-then-reload sequence. Always take the domain lock first.
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{
    constants::{LOCK_FILE_SUFFIX, RELOAD_LOCK_NAME},
    error::NginxManagerError,
};

/// An exclusive lock released when dropped.
#[derive(Debug)]
pub struct SiteLock {
    file: File,
    path: PathBuf,
}

impl SiteLock {
    /// Blocks until the exclusive lock named `key` inside `dir` is held.
    ///
    /// `key` must already be a validated domain or a fixed internal name.
    pub fn acquire(dir: &Path, key: &str) -> Result<Self, NginxManagerError> {
        fs::create_dir_all(dir)
            .map_err(|source| access_error("create lock directory", dir, source))?;

        let path = dir.join(format!("{key}{LOCK_FILE_SUFFIX}"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| access_error("open lock file", &path, source))?;

        FileExt::lock_exclusive(&file).map_err(|source| NginxManagerError::LockError {
            path: path.clone(),
            source,
        })?;
        debug!("Acquired lock {}", path.display());

        Ok(Self { file, path })
    }

    /// Takes the global lock around validation and reload.
    pub fn reload(dir: &Path) -> Result<Self, NginxManagerError> {
        Self::acquire(dir, RELOAD_LOCK_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Refused access stays [`NginxManagerError::PermissionDenied`]; anything else is a lock failure.
fn access_error(action: &'static str, path: &Path, source: std::io::Error) -> NginxManagerError {
    match NginxManagerError::from_io(action, path, source) {
        NginxManagerError::Io { path, source } => NginxManagerError::LockError { path, source },
        denied => denied,
    }
}

impl Drop for SiteLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!("Failed to release lock {}: {err}", self.path.display());
        }
    }
}
