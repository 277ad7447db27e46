//! TLS certificate issuance and renewal through the external ACME client.
use tracing::{info, warn};

use crate::{error::NginxManagerError, pipeline::ActivationPipeline, site::validate_domain};

/// Runs the configured certificate commands. Output is never parsed and nothing is retried.
pub struct CertificateCoordinator<'a> {
    pipeline: &'a ActivationPipeline,
}

impl<'a> CertificateCoordinator<'a> {
    pub fn new(pipeline: &'a ActivationPipeline) -> Self {
        Self { pipeline }
    }

    /// Requests a certificate for a single domain.
    pub fn issue_certificate(&self, domain: &str) -> Result<(), NginxManagerError> {
        validate_domain(domain)?;
        let control = self.pipeline.control();
        let (spec, output) =
            control.run_privileged(&control.commands().certificate_issue, Some(domain))?;
        output.into_result(&spec)?;
        info!("Issued certificate for {domain}");
        Ok(())
    }

    /// Renews every certificate due for renewal, then reloads the server.
    ///
    /// The reload happens whether or not renewal succeeded, including when the
    /// renewal command could not be started; a renewal failure is reported after it.
    pub fn renew_all(&self) -> Result<(), NginxManagerError> {
        let control = self.pipeline.control();
        let renewed = control
            .run_privileged(&control.commands().certificate_renew, None)
            .and_then(|(spec, output)| output.into_result(&spec));
        if let Err(err) = &renewed {
            warn!("Certificate renewal failed, reloading anyway: {err}");
        }

        let reloaded = self.pipeline.reload();
        renewed?;
        reloaded?;
        info!("Renewed certificates");
        Ok(())
    }
}
