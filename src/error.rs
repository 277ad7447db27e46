//! Error handling for ngsite.
use std::{io, path::PathBuf};
use thiserror::Error;

/// Defines all possible errors raised while managing site configurations.
#[derive(Debug, Error)]
pub enum NginxManagerError {
    /// The referenced domain has no record in the available directory.
    #[error("Domain '{0}' has no available site record")]
    NotFound(String),

    /// An enablement link for the domain already exists.
    #[error("Domain '{0}' is already enabled")]
    AlreadyEnabled(String),

    /// The external syntax validator rejected the configuration after a write.
    #[error("Configuration for '{domain}' failed validation: {detail}")]
    ConfigurationError {
        /// Domain whose change triggered the validation.
        domain: String,
        /// Validator output.
        detail: String,
    },

    /// Filesystem or privileged-command access was refused.
    #[error("Permission denied while trying to {action} '{}'", .path.display())]
    PermissionDenied {
        /// What was being attempted (e.g. "write", "link").
        action: &'static str,
        /// The path the action targeted.
        path: PathBuf,
    },

    /// An external tool exited with a non-zero status.
    #[error("Command `{command}` exited with status {status:?}: {stderr}")]
    ExternalCommandError {
        /// Rendered command line.
        command: String,
        /// Exit code, `None` when terminated by a signal.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// An external tool could not be started at all.
    #[error("Failed to run `{command}`: {source}")]
    CommandSpawnError {
        /// Rendered command line.
        command: String,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// A domain, target or path segment failed input validation.
    #[error("Invalid {field} '{value}': {reason}")]
    InvalidInput {
        /// Which input was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A site record could not be spliced because its block structure is unusable.
    #[error("Site record for '{domain}' is malformed: {reason}")]
    MalformedRecord {
        /// Domain whose record was inspected.
        domain: String,
        /// Description of the structural problem.
        reason: String,
    },

    /// Any other filesystem failure.
    #[error("Filesystem error at '{}': {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Acquiring an advisory lock failed.
    #[error("Failed to lock '{}': {source}", .path.display())]
    LockError {
        /// Lock file path.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: io::Error,
    },

    /// Error loading the ngsite configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl NginxManagerError {
    /// Classifies an I/O failure on `path`, keeping permission problems distinct.
    pub fn from_io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            NginxManagerError::PermissionDenied { action, path }
        } else {
            NginxManagerError::Io { path, source }
        }
    }

    /// Returns true for errors caused by refused access.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, NginxManagerError::PermissionDenied { .. })
    }
}

/// Error type for configuration file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading or accessing a configuration file.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A `${VAR}` reference had no value in the environment.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// A command entry was declared with no program.
    #[error("Command '{0}' must contain at least a program name")]
    EmptyCommand(&'static str),
}
