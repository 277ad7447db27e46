use std::sync::{Mutex, OnceLock};

use crate::{
    error::NginxManagerError,
    runner::{CommandOutput, CommandRunner, CommandSpec},
};

/// Global lock for environment variable modifications in tests.
/// All tests that modify environment variables should acquire this lock
/// to prevent race conditions between parallel test executions.
pub static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A [`CommandRunner`] that executes nothing. Every invocation is recorded and
/// succeeds unless its rendered command line contains a pattern registered with
/// [`RecordingRunner::fail_on`].
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    failures: Mutex<Vec<(String, String)>>,
    stdout: Mutex<Vec<(String, String)>>,
    missing: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` exit with status 1 and `stderr`.
    pub fn fail_on(self, pattern: &str, stderr: &str) -> Self {
        self.set_failure(pattern, stderr);
        self
    }

    /// Commands containing `pattern` print `stdout`.
    pub fn respond_on(self, pattern: &str, stdout: &str) -> Self {
        self.stdout
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((pattern.to_string(), stdout.to_string()));
        self
    }

    /// Commands containing `pattern` fail to start, as if the program were not installed.
    pub fn missing_program(self, pattern: &str) -> Self {
        self.missing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(pattern.to_string());
        self
    }

    /// Registers a failure on an already shared runner.
    pub fn set_failure(&self, pattern: &str, stderr: &str) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((pattern.to_string(), stderr.to_string()));
    }

    /// Drops every registered failure.
    pub fn clear_failures(&self) {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Rendered command lines, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.specs().iter().map(ToString::to_string).collect()
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of invocations whose command line contains `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.contains(pattern))
            .count()
    }

    pub fn invoked(&self, pattern: &str) -> bool {
        self.count(pattern) > 0
    }

    /// Standard input passed to the last command containing `pattern`.
    pub fn stdin_for(&self, pattern: &str) -> Option<String> {
        self.specs()
            .into_iter()
            .rev()
            .find(|spec| spec.to_string().contains(pattern))
            .and_then(|spec| spec.stdin)
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, NginxManagerError> {
        let line = spec.to_string();
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(spec.clone());

        let missing = self
            .missing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|pattern| line.contains(pattern.as_str()));
        if missing {
            return Err(NginxManagerError::CommandSpawnError {
                command: line,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, stderr)| stderr.clone());
        if let Some(stderr) = failure {
            return Ok(CommandOutput::failure(1, stderr));
        }

        let stdout = self
            .stdout
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, stdout)| stdout.clone())
            .unwrap_or_default();

        Ok(CommandOutput {
            status: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}
