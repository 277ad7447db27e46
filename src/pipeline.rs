//! Activation and deactivation of site records.
//!
//! An activation moves through `Rendered → Written → Linked → Validated → Reloaded`.
//! A validator rejection after the write moves it to `RolledBack` instead: the file
//! and link stay as written but no reload is issued, so the server keeps serving its
//! last accepted configuration. Any I/O or command error moves it to `Failed`.
use std::path::{Path, PathBuf};
use strum_macros::AsRefStr;
use tracing::{debug, info, warn};

use crate::{
    error::NginxManagerError,
    lock::SiteLock,
    nginx::{NginxControl, Validation},
    render::render_site,
    site::{Site, validate_domain},
    store::SiteStore,
};

/// Stages an activation attempt passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ActivationStage {
    Rendered,
    Written,
    Linked,
    Validated,
    Reloaded,
    /// Validation failed; reload withheld.
    RolledBack,
    /// An I/O or external command error interrupted the attempt.
    Failed,
}

/// Summary of a completed activation or validate+reload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub domain: String,
    /// Whether this attempt created the enablement link.
    pub newly_linked: bool,
    /// Stages reached, in order.
    pub stages: Vec<ActivationStage>,
}

/// Tracks the stages of one attempt and logs each transition.
struct Attempt {
    domain: String,
    stages: Vec<ActivationStage>,
}

impl Attempt {
    fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            stages: Vec::new(),
        }
    }

    fn advance(&mut self, stage: ActivationStage) {
        debug!("{}: {}", self.domain, stage.as_ref());
        self.stages.push(stage);
    }

    /// Records the escape transition matching `err` and hands the error back.
    fn fail<T>(&mut self, err: NginxManagerError) -> Result<T, NginxManagerError> {
        let stage = match err {
            NginxManagerError::ConfigurationError { .. } => ActivationStage::RolledBack,
            _ => ActivationStage::Failed,
        };
        self.advance(stage);
        Err(err)
    }

    fn check<T>(&mut self, result: Result<T, NginxManagerError>) -> Result<T, NginxManagerError> {
        result.or_else(|err| self.fail(err))
    }

    fn finish(self, newly_linked: bool) -> ActivationReport {
        ActivationReport {
            domain: self.domain,
            newly_linked,
            stages: self.stages,
        }
    }
}

/// Orchestrates write → enable → validate → reload.
#[derive(Clone)]
pub struct ActivationPipeline {
    store: SiteStore,
    control: NginxControl,
    lock_dir: PathBuf,
}

impl ActivationPipeline {
    pub fn new(store: SiteStore, control: NginxControl, lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            control,
            lock_dir: lock_dir.into(),
        }
    }

    pub fn store(&self) -> &SiteStore {
        &self.store
    }

    pub fn control(&self) -> &NginxControl {
        &self.control
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Writes, links, validates and reloads `site`.
    ///
    /// Re-activating a domain replaces its record in full. On a validator rejection the
    /// record and link are left in place and [`NginxManagerError::ConfigurationError`]
    /// is returned without reloading.
    pub fn activate(&self, site: &Site) -> Result<ActivationReport, NginxManagerError> {
        site.validate()?;
        let _domain_lock = SiteLock::acquire(&self.lock_dir, &site.domain)?;
        let domain = site.domain.as_str();

        let mut attempt = Attempt::new(domain);
        let text = render_site(site);
        attempt.advance(ActivationStage::Rendered);

        attempt.check(self.store.write(domain, &text))?;
        attempt.advance(ActivationStage::Written);

        let newly_linked = if attempt.check(self.store.is_enabled(domain))? {
            false
        } else {
            match self.store.enable(domain) {
                Ok(()) => true,
                Err(NginxManagerError::AlreadyEnabled(_)) => false,
                Err(err) => return attempt.fail(err),
            }
        };
        attempt.advance(ActivationStage::Linked);

        self.validate_then_reload(&mut attempt)?;
        info!("Activated {domain} ({} mode)", site.mode);
        Ok(attempt.finish(newly_linked))
    }

    /// Removes the link and the record for `domain`, then validates and reloads.
    ///
    /// A domain is unknown only when neither its record nor its link exists, so a
    /// link left dangling by an earlier partial removal can still be cleaned up.
    /// Both removals are attempted even if the first fails, and validation and reload
    /// run either way; the first removal error is reported ahead of any
    /// validation error. A validator rejection does not undo the removal.
    pub fn deactivate(&self, domain: &str) -> Result<(), NginxManagerError> {
        validate_domain(domain)?;
        if !self.is_known(domain)? {
            return Err(NginxManagerError::NotFound(domain.to_string()));
        }

        let _domain_lock = SiteLock::acquire(&self.lock_dir, domain)?;
        if !self.is_known(domain)? {
            return Err(NginxManagerError::NotFound(domain.to_string()));
        }
        let has_record = self.store.exists(domain)?;

        let unlinked = self.store.disable(domain);
        let removed = if has_record {
            self.store.remove(domain)
        } else {
            debug!("{domain} has no record left, removing its link only");
            Ok(())
        };
        let removal = match (unlinked, removed) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(first), second) => {
                if let Err(err) = second {
                    warn!("Removing record for {domain} also failed: {err}");
                }
                Err(first)
            }
            (Ok(()), Err(err)) => Err(err),
        };
        if let Err(err) = &removal {
            warn!("Partial removal of {domain}, validating anyway: {err}");
        }

        let mut attempt = Attempt::new(domain);
        let reloaded = self.validate_then_reload(&mut attempt);
        removal?;
        reloaded?;
        info!("Deactivated {domain}");
        Ok(())
    }

    fn is_known(&self, domain: &str) -> Result<bool, NginxManagerError> {
        Ok(self.store.exists(domain)? || self.store.is_enabled(domain)?)
    }

    /// Validates the full server configuration and reloads only if it passed.
    ///
    /// Used after any change to an existing record.
    pub fn validate_and_reload(&self, domain: &str) -> Result<ActivationReport, NginxManagerError> {
        let mut attempt = Attempt::new(domain);
        self.validate_then_reload(&mut attempt)?;
        Ok(attempt.finish(false))
    }

    /// Reloads the server without validating first.
    pub fn reload(&self) -> Result<(), NginxManagerError> {
        let _reload_lock = SiteLock::reload(&self.lock_dir)?;
        self.control.reload()
    }

    fn validate_then_reload(&self, attempt: &mut Attempt) -> Result<(), NginxManagerError> {
        let _reload_lock = attempt.check(SiteLock::reload(&self.lock_dir))?;

        match attempt.check(self.control.validate())? {
            Validation::Passed => attempt.advance(ActivationStage::Validated),
            Validation::Failed(detail) => {
                let domain = attempt.domain.clone();
                warn!("Configuration rejected after changing {domain}; reload withheld");
                return attempt.fail(NginxManagerError::ConfigurationError { domain, detail });
            }
        }

        attempt.check(self.control.reload())?;
        attempt.advance(ActivationStage::Reloaded);
        Ok(())
    }
}
