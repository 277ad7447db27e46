//! Operator-facing API tying the store, pipeline, sub-routes and certificates together.
use std::{collections::BTreeSet, sync::Arc};

use crate::{
    certs::CertificateCoordinator,
    config::Config,
    error::NginxManagerError,
    nginx::NginxControl,
    pipeline::{ActivationPipeline, ActivationReport},
    runner::{CommandRunner, Privilege, SystemRunner},
    site::{Site, SiteMode, SubrouteFragment},
    store::SiteStore,
    subroute::SubrouteMutator,
};

/// Entry point for every operation exposed to operators.
#[derive(Clone)]
pub struct NginxManager {
    pipeline: ActivationPipeline,
}

impl NginxManager {
    /// Builds a manager that runs real commands.
    pub fn from_config(config: &Config) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    /// Builds a manager whose external commands go through `runner`.
    pub fn with_runner(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        let privilege = Privilege::resolve(config.privilege, &config.sudo_program);
        let store = SiteStore::new(
            config.paths.sites_available.clone(),
            config.paths.sites_enabled.clone(),
        )
        .with_escalation(runner.clone(), privilege.clone());
        let control = NginxControl::new(runner, config.commands.clone(), privilege);
        Self {
            pipeline: ActivationPipeline::new(store, control, config.paths.lock_dir.clone()),
        }
    }

    pub fn pipeline(&self) -> &ActivationPipeline {
        &self.pipeline
    }

    /// Version string of the installed server.
    pub fn version(&self) -> Result<String, NginxManagerError> {
        self.pipeline.control().version()
    }

    pub fn is_installed(&self) -> bool {
        self.pipeline.control().is_installed()
    }

    /// Every domain with an available record.
    pub fn list_domains(&self) -> Result<BTreeSet<String>, NginxManagerError> {
        self.pipeline.store().list()
    }

    /// Every domain currently linked into the enabled directory.
    pub fn enabled_domains(&self) -> Result<BTreeSet<String>, NginxManagerError> {
        self.pipeline.store().list_enabled()
    }

    pub fn add_domain(
        &self,
        domain: &str,
        mode: SiteMode,
        target: &str,
    ) -> Result<ActivationReport, NginxManagerError> {
        self.pipeline.activate(&Site::new(domain, mode, target))
    }

    pub fn delete_domain(&self, domain: &str) -> Result<(), NginxManagerError> {
        self.pipeline.deactivate(domain)
    }

    /// Raw text of the record for `domain`.
    pub fn view_domain_config(&self, domain: &str) -> Result<String, NginxManagerError> {
        self.pipeline.store().read(domain)
    }

    pub fn add_subroute(
        &self,
        domain: &str,
        segment: &str,
        mode: SiteMode,
        target: &str,
    ) -> Result<ActivationReport, NginxManagerError> {
        SubrouteMutator::new(&self.pipeline)
            .append_fragment(domain, &SubrouteFragment::new(segment, mode, target))
    }

    pub fn issue_certificate(&self, domain: &str) -> Result<(), NginxManagerError> {
        CertificateCoordinator::new(&self.pipeline).issue_certificate(domain)
    }

    pub fn renew_certificates(&self) -> Result<(), NginxManagerError> {
        CertificateCoordinator::new(&self.pipeline).renew_all()
    }
}
