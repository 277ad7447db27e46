//! External command execution and privilege escalation.
use nix::unistd::geteuid;
use serde::Deserialize;
use std::{
    fmt,
    io::Write,
    process::{Command, Stdio},
    thread,
};
use strum_macros::{AsRefStr, EnumString};
use tracing::debug;

use crate::error::NginxManagerError;

/// A single command invocation. Arguments are passed as-is, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Text written to the child's standard input, if any.
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Builds a spec from an argv list, substituting `{domain}` in every argument.
    pub fn from_template(argv: &[String], domain: Option<&str>) -> Self {
        let mut parts = argv.iter().map(|part| match domain {
            Some(domain) => part.replace("{domain}", domain),
            None => part.clone(),
        });
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the child was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self {
            status: Some(0),
            ..Self::default()
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Converts a non-zero exit into [`NginxManagerError::ExternalCommandError`].
    pub fn into_result(self, spec: &CommandSpec) -> Result<Self, NginxManagerError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(NginxManagerError::ExternalCommandError {
                command: spec.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs external commands to completion. Implementations must block until the child exits.
pub trait CommandRunner: Send + Sync {
    /// Executes `spec`. Only a failure to start the process is an `Err`; a non-zero
    /// exit is reported through [`CommandOutput::status`].
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, NginxManagerError>;
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, NginxManagerError> {
        debug!("Running `{spec}`");

        let spawn_error = |source| NginxManagerError::CommandSpawnError {
            command: spec.to_string(),
            source,
        };

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin from its own thread so a child echoing to stdout cannot deadlock us.
        let writer = match (child.stdin.take(), spec.stdin.clone()) {
            (Some(mut pipe), Some(input)) => Some(thread::spawn(move || {
                pipe.write_all(input.as_bytes())
            })),
            _ => None,
        };

        let output = child.wait_with_output().map_err(spawn_error)?;

        if let Some(handle) = writer
            && let Ok(Err(err)) = handle.join()
        {
            debug!("Writing stdin for `{spec}` failed: {err}");
        }

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("`{spec}` exited with {:?}", result.status);
        Ok(result)
    }
}

/// When privileged operations go through `sudo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrivilegeMode {
    /// Use sudo unless already running as root.
    #[default]
    Auto,
    /// Always prefix privileged commands with sudo.
    Always,
    /// Never escalate; permission failures are reported as-is.
    Never,
}

/// Wraps privileged commands with the configured escalation program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Privilege {
    sudo: Option<String>,
}

impl Privilege {
    pub fn resolve(mode: PrivilegeMode, sudo_program: &str) -> Self {
        let escalate = match mode {
            PrivilegeMode::Auto => !geteuid().is_root(),
            PrivilegeMode::Always => true,
            PrivilegeMode::Never => false,
        };
        Self {
            sudo: escalate.then(|| sudo_program.to_string()),
        }
    }

    /// No escalation at all.
    pub fn none() -> Self {
        Self { sudo: None }
    }

    pub fn is_escalating(&self) -> bool {
        self.sudo.is_some()
    }

    /// Returns `spec` prefixed with the escalation program, or unchanged.
    pub fn wrap(&self, spec: CommandSpec) -> CommandSpec {
        match &self.sudo {
            Some(sudo) => {
                let mut args = Vec::with_capacity(spec.args.len() + 1);
                args.push(spec.program);
                args.extend(spec.args);
                CommandSpec {
                    program: sudo.clone(),
                    args,
                    stdin: spec.stdin,
                }
            }
            None => spec,
        }
    }
}
