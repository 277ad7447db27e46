//! Filesystem-backed registry of available and enabled site records.
use std::{
    collections::BTreeSet,
    fs, io,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use crate::{
    constants::TEMP_RECORD_PREFIX,
    error::NginxManagerError,
    runner::{CommandRunner, CommandSpec, Privilege},
    site::validate_domain,
};

/// Runner and privilege wrapper used to retry operations refused to this account.
#[derive(Clone)]
struct Escalation {
    runner: Arc<dyn CommandRunner>,
    privilege: Privilege,
}

/// Reads and mutates the available/enabled directory pair.
///
/// No state is cached: every call goes back to the filesystem.
#[derive(Clone)]
pub struct SiteStore {
    available: PathBuf,
    enabled: PathBuf,
    escalation: Option<Escalation>,
}

impl SiteStore {
    pub fn new(available: impl Into<PathBuf>, enabled: impl Into<PathBuf>) -> Self {
        Self {
            available: available.into(),
            enabled: enabled.into(),
            escalation: None,
        }
    }

    /// Retries permission-denied mutations through `runner` wrapped by `privilege`.
    /// Has no effect when `privilege` does not escalate.
    pub fn with_escalation(mut self, runner: Arc<dyn CommandRunner>, privilege: Privilege) -> Self {
        self.escalation = privilege
            .is_escalating()
            .then_some(Escalation { runner, privilege });
        self
    }

    pub fn available_dir(&self) -> &Path {
        &self.available
    }

    pub fn enabled_dir(&self) -> &Path {
        &self.enabled
    }

    /// Path of the record for `domain` in the available directory.
    pub fn available_path(&self, domain: &str) -> Result<PathBuf, NginxManagerError> {
        validate_domain(domain)?;
        Ok(self.available.join(domain))
    }

    /// Path of the enablement link for `domain`.
    pub fn enabled_path(&self, domain: &str) -> Result<PathBuf, NginxManagerError> {
        validate_domain(domain)?;
        Ok(self.enabled.join(domain))
    }

    /// Names of every regular file in the available directory.
    pub fn list(&self) -> Result<BTreeSet<String>, NginxManagerError> {
        let entries = fs::read_dir(&self.available)
            .map_err(|err| NginxManagerError::from_io("list", &self.available, err))?;

        let mut domains = BTreeSet::new();
        for entry in entries {
            let entry =
                entry.map_err(|err| NginxManagerError::from_io("list", &self.available, err))?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            // Follows symlinks, so a link to a regular file counts as a record.
            if fs::metadata(entry.path()).is_ok_and(|meta| meta.is_file()) {
                domains.insert(name);
            }
        }
        Ok(domains)
    }

    /// Names of every entry in the enabled directory.
    pub fn list_enabled(&self) -> Result<BTreeSet<String>, NginxManagerError> {
        let entries = fs::read_dir(&self.enabled)
            .map_err(|err| NginxManagerError::from_io("list", &self.enabled, err))?;

        Ok(entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect())
    }

    pub fn exists(&self, domain: &str) -> Result<bool, NginxManagerError> {
        Ok(self.available_path(domain)?.is_file())
    }

    /// True when an enablement entry exists, whether or not it still resolves.
    pub fn is_enabled(&self, domain: &str) -> Result<bool, NginxManagerError> {
        Ok(fs::symlink_metadata(self.enabled_path(domain)?).is_ok())
    }

    /// Returns the raw text of the record for `domain`.
    pub fn read(&self, domain: &str) -> Result<String, NginxManagerError> {
        let path = self.available_path(domain)?;
        fs::read_to_string(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => NginxManagerError::NotFound(domain.to_string()),
            _ => NginxManagerError::from_io("read", &path, err),
        })
    }

    /// Replaces the record for `domain` with `text`.
    ///
    /// The text goes to a temporary sibling first and is renamed into place, so
    /// readers never observe a half-written record.
    pub fn write(&self, domain: &str, text: &str) -> Result<(), NginxManagerError> {
        let path = self.available_path(domain)?;
        let temp = self.available.join(format!("{TEMP_RECORD_PREFIX}{domain}"));

        let direct = fs::write(&temp, text).and_then(|_| fs::rename(&temp, &path));
        match direct {
            Ok(()) => {
                debug!("Wrote {}", path.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                let _ = fs::remove_file(&temp);
                self.escalate(
                    "write",
                    &path,
                    CommandSpec::new("tee")
                        .arg(path.display().to_string())
                        .stdin(text),
                    err,
                )
            }
            Err(err) => {
                let _ = fs::remove_file(&temp);
                Err(NginxManagerError::from_io("write", &path, err))
            }
        }
    }

    /// Links `domain` into the enabled directory.
    pub fn enable(&self, domain: &str) -> Result<(), NginxManagerError> {
        let target = self.available_path(domain)?;
        let link = self.enabled_path(domain)?;

        if !target.is_file() {
            return Err(NginxManagerError::NotFound(domain.to_string()));
        }
        if fs::symlink_metadata(&link).is_ok() {
            return Err(NginxManagerError::AlreadyEnabled(domain.to_string()));
        }
        // A relative target would resolve against the enabled directory.
        let target = std::path::absolute(&target)
            .map_err(|err| NginxManagerError::from_io("link", &target, err))?;

        match symlink(&target, &link) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(NginxManagerError::AlreadyEnabled(domain.to_string()));
            }
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                self.escalate(
                    "link",
                    &link,
                    CommandSpec::new("ln")
                        .arg("-s")
                        .arg(target.display().to_string())
                        .arg(link.display().to_string()),
                    err,
                )?;
            }
            Err(err) => return Err(NginxManagerError::from_io("link", &link, err)),
        }

        info!("Enabled {domain}");
        Ok(())
    }

    /// Removes the enablement link if present; a missing link is not an error.
    pub fn disable(&self, domain: &str) -> Result<(), NginxManagerError> {
        let link = self.enabled_path(domain)?;
        if fs::symlink_metadata(&link).is_err() {
            debug!("{domain} was not enabled");
            return Ok(());
        }
        self.remove_path("unlink", &link)?;
        info!("Disabled {domain}");
        Ok(())
    }

    /// Deletes the record for `domain`. Does not touch the enablement link.
    pub fn remove(&self, domain: &str) -> Result<(), NginxManagerError> {
        let path = self.available_path(domain)?;
        if fs::symlink_metadata(&path).is_err() {
            return Err(NginxManagerError::NotFound(domain.to_string()));
        }
        self.remove_path("remove", &path)?;
        info!("Removed record for {domain}");
        Ok(())
    }

    fn remove_path(&self, action: &'static str, path: &Path) -> Result<(), NginxManagerError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => self.escalate(
                action,
                path,
                CommandSpec::new("rm")
                    .arg("-f")
                    .arg(path.display().to_string()),
                err,
            ),
            Err(err) => Err(NginxManagerError::from_io(action, path, err)),
        }
    }

    /// Re-runs a refused operation with elevated privileges, or reports the refusal.
    fn escalate(
        &self,
        action: &'static str,
        path: &Path,
        spec: CommandSpec,
        original: io::Error,
    ) -> Result<(), NginxManagerError> {
        let Some(escalation) = &self.escalation else {
            return Err(NginxManagerError::from_io(action, path, original));
        };

        let spec = escalation.privilege.wrap(spec);
        debug!("Retrying {action} of {} as `{spec}`", path.display());

        let output = escalation.runner.run(&spec)?;
        if output.is_success() {
            Ok(())
        } else {
            Err(NginxManagerError::PermissionDenied {
                action,
                path: path.to_path_buf(),
            })
        }
    }
}
