//! Configuration management for ngsite.
use regex::Regex;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{
    constants::{
        CONFIG_SEARCH_PATHS, DEFAULT_LOCK_DIR, DEFAULT_SITES_AVAILABLE, DEFAULT_SITES_ENABLED,
        DEFAULT_SUDO_PROGRAM,
    },
    error::ConfigError,
    runner::PrivilegeMode,
};

/// Represents the structure of the configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version.
    pub version: String,
    /// Directory layout of the web server configuration tree.
    pub paths: PathsConfig,
    /// When to escalate privileged operations.
    pub privilege: PrivilegeMode,
    /// Program used for escalation.
    pub sudo_program: String,
    /// External commands.
    pub commands: CommandsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            paths: PathsConfig::default(),
            privilege: PrivilegeMode::default(),
            sudo_program: DEFAULT_SUDO_PROGRAM.to_string(),
            commands: CommandsConfig::default(),
        }
    }
}

/// Where site records, enablement links and lock files live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub sites_available: PathBuf,
    pub sites_enabled: PathBuf,
    pub lock_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sites_available: PathBuf::from(DEFAULT_SITES_AVAILABLE),
            sites_enabled: PathBuf::from(DEFAULT_SITES_ENABLED),
            lock_dir: PathBuf::from(DEFAULT_LOCK_DIR),
        }
    }
}

/// Argument vectors for each external collaborator. `{domain}` is substituted literally.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub validate: Vec<String>,
    pub reload: Vec<String>,
    pub version: Vec<String>,
    pub certificate_issue: Vec<String>,
    pub certificate_renew: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            validate: argv(&["nginx", "-t"]),
            reload: argv(&["systemctl", "reload", "nginx"]),
            version: argv(&["nginx", "-v"]),
            certificate_issue: argv(&["certbot", "--nginx", "-d", "{domain}"]),
            certificate_renew: argv(&["certbot", "renew"]),
        }
    }
}

impl CommandsConfig {
    fn check(&self) -> Result<(), ConfigError> {
        let entries = [
            ("validate", &self.validate),
            ("reload", &self.reload),
            ("version", &self.version),
            ("certificate_issue", &self.certificate_issue),
            ("certificate_renew", &self.certificate_renew),
        ];
        for (name, argv) in entries {
            if argv.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(ConfigError::EmptyCommand(name));
            }
        }
        Ok(())
    }
}

/// Expands `${VAR}` and `$VAR` references using the process environment.
///
/// nginx variables such as `$host` never appear in this file, so every reference
/// must resolve.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("env pattern is valid");

    let mut missing = None;
    let result = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(ConfigError::MissingEnvVar(var_name)),
        None => Ok(result.into_owned()),
    }
}

fn locate_config(config_path: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = config_path {
        return Some(PathBuf::from(path));
    }

    CONFIG_SEARCH_PATHS
        .iter()
        .map(Path::new)
        .find(|candidate| candidate.exists())
        .map(Path::to_path_buf)
}

/// Loads and parses the configuration file, expanding environment variables.
///
/// An explicit path must exist. Without one, the well-known locations are searched and
/// the built-in defaults are used when none is present.
pub fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
    let Some(path) = locate_config(config_path) else {
        debug!("No configuration file found, using defaults");
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&path).map_err(|e| {
        ConfigError::ReadError(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, path.display()),
        ))
    })?;

    let expanded = expand_env_vars(&content)?;
    let config: Config = serde_yaml::from_str(&expanded)?;
    config.commands.check()?;

    debug!("Loaded configuration from {}", path.display());
    Ok(config)
}
