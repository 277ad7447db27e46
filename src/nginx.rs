//! The live web server, reached only through external commands.
use std::{env, path::Path, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    config::CommandsConfig,
    error::NginxManagerError,
    runner::{CommandOutput, CommandRunner, CommandSpec, Privilege},
};

/// Result of running the syntax validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Passed,
    /// The validator rejected the configuration; carries its diagnostics.
    Failed(String),
}

impl Validation {
    pub fn passed(&self) -> bool {
        matches!(self, Validation::Passed)
    }
}

/// Validate/reload/version commands for the server process.
#[derive(Clone)]
pub struct NginxControl {
    runner: Arc<dyn CommandRunner>,
    commands: CommandsConfig,
    privilege: Privilege,
}

impl NginxControl {
    pub fn new(runner: Arc<dyn CommandRunner>, commands: CommandsConfig, privilege: Privilege) -> Self {
        Self {
            runner,
            commands,
            privilege,
        }
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    pub fn commands(&self) -> &CommandsConfig {
        &self.commands
    }

    pub fn privilege(&self) -> &Privilege {
        &self.privilege
    }

    /// Runs a configured privileged command, with `{domain}` substituted when given.
    pub(crate) fn run_privileged(
        &self,
        argv: &[String],
        domain: Option<&str>,
    ) -> Result<(CommandSpec, CommandOutput), NginxManagerError> {
        let spec = self.privilege.wrap(CommandSpec::from_template(argv, domain));
        let output = self.runner.run(&spec)?;
        Ok((spec, output))
    }

    /// Asks the server to check its full configuration without applying it.
    pub fn validate(&self) -> Result<Validation, NginxManagerError> {
        let (spec, output) = self.run_privileged(&self.commands.validate, None)?;
        if output.is_success() {
            debug!("`{spec}` accepted the configuration");
            Ok(Validation::Passed)
        } else {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim().to_string()
            } else {
                output.stderr.trim().to_string()
            };
            warn!("`{spec}` rejected the configuration: {detail}");
            Ok(Validation::Failed(detail))
        }
    }

    /// Signals the server to load its configuration again.
    pub fn reload(&self) -> Result<(), NginxManagerError> {
        let (spec, output) = self.run_privileged(&self.commands.reload, None)?;
        output.into_result(&spec)?;
        info!("Reloaded nginx");
        Ok(())
    }

    /// Version string reported by the server binary.
    pub fn version(&self) -> Result<String, NginxManagerError> {
        let spec = CommandSpec::from_template(&self.commands.version, None);
        let output = self.runner.run(&spec)?.into_result(&spec)?;
        // `nginx -v` writes to stderr.
        let text = if output.stdout.trim().is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(text.trim().to_string())
    }

    /// True when the validator program can be found on `PATH`.
    pub fn is_installed(&self) -> bool {
        let Some(program) = self.commands.validate.first() else {
            return false;
        };
        let program = Path::new(program);
        if program.components().count() > 1 {
            return program.is_file();
        }
        env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}
