//! Command-line interface for ngsite.
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::site::SiteMode;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let level = match trimmed.to_ascii_lowercase().as_str() {
            "off" => Some(LevelFilter::OFF),
            "error" | "err" => Some(LevelFilter::ERROR),
            "warn" | "warning" => Some(LevelFilter::WARN),
            "info" => Some(LevelFilter::INFO),
            "debug" => Some(LevelFilter::DEBUG),
            "trace" => Some(LevelFilter::TRACE),
            _ => None,
        }
        .ok_or_else(|| format!("invalid log level '{trimmed}'"))?;

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for ngsite.
#[derive(Parser)]
#[command(name = "ngsite", version, author)]
#[command(about = "Manage nginx sites, sub-routes and certificates", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Path to the configuration file (defaults to `ngsite.yaml`, then `/etc/ngsite/ngsite.yaml`).
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for ngsite.
#[derive(Subcommand)]
pub enum Commands {
    /// List configured domains.
    List {
        /// Emit machine-readable JSON output instead of a list.
        #[arg(long)]
        json: bool,
    },

    /// Create or replace a site and make it live.
    Add {
        /// Domain name, also used as the record's file name.
        domain: String,

        /// `static` to serve a directory, `proxy` to forward to an upstream URL.
        #[arg(short, long)]
        mode: SiteMode,

        /// Document root (static) or upstream URL (proxy).
        target: String,
    },

    /// Remove a site's link and record, then reload.
    Delete {
        /// Domain to remove.
        domain: String,
    },

    /// Print the raw configuration of a site.
    Show {
        /// Domain to print.
        domain: String,
    },

    /// Append a sub-route to an existing site.
    Subroute {
        /// Domain whose record receives the route.
        domain: String,

        /// Path segment, without the leading slash (e.g. `blog`).
        segment: String,

        /// `static` to alias a directory, `proxy` to forward to an upstream URL.
        #[arg(short, long)]
        mode: SiteMode,

        /// Aliased directory (static) or upstream URL (proxy).
        target: String,
    },

    /// Manage TLS certificates.
    Cert {
        #[command(subcommand)]
        action: CertCommand,
    },

    /// Print the installed nginx version.
    Version,
}

/// Certificate subcommands.
#[derive(Subcommand)]
pub enum CertCommand {
    /// Issue a certificate for one domain.
    Issue {
        /// Domain to certify.
        domain: String,
    },

    /// Renew all certificates and reload.
    Renew,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
