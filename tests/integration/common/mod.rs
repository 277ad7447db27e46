#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use ngsite::{
    config::Config, manager::NginxManager, runner::PrivilegeMode, test_utils::RecordingRunner,
};
use tempfile::{TempDir, tempdir};

/// A throwaway nginx configuration tree with its own lock directory.
pub struct Sandbox {
    _temp: TempDir,
    root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = tempdir().expect("failed to create tempdir");
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("sites-available")).expect("failed to create available dir");
        fs::create_dir_all(root.join("sites-enabled")).expect("failed to create enabled dir");
        Self { _temp: temp, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn available(&self) -> PathBuf {
        self.root.join("sites-available")
    }

    pub fn enabled(&self) -> PathBuf {
        self.root.join("sites-enabled")
    }

    /// Configuration pointing at this sandbox, never escalating.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.privilege = PrivilegeMode::Never;
        config.paths.sites_available = self.available();
        config.paths.sites_enabled = self.enabled();
        config.paths.lock_dir = self.root.join("locks");
        config
    }

    pub fn manager(&self, runner: Arc<RecordingRunner>) -> NginxManager {
        NginxManager::with_runner(&self.config(), runner)
    }

    /// Writes an `ngsite.yaml` whose validate/reload commands are the given programs.
    pub fn write_config_file(&self, validate: &str, reload: &str) -> PathBuf {
        let path = self.root.join("ngsite.yaml");
        fs::write(
            &path,
            format!(
                r#"version: "1"
privilege: never
paths:
  sites_available: "{available}"
  sites_enabled: "{enabled}"
  lock_dir: "{locks}"
commands:
  validate: ["{validate}"]
  reload: ["{reload}"]
  version: ["echo", "nginx version: nginx/1.24.0"]
  certificate_issue: ["echo", "issued {{domain}}"]
  certificate_renew: ["true"]
"#,
                available = self.available().display(),
                enabled = self.enabled().display(),
                locks = self.root.join("locks").display(),
            ),
        )
        .expect("failed to write config");
        path
    }
}

/// Number of nested `location` rules in a record, excluding the root rule.
pub fn subroute_count(text: &str) -> usize {
    text.matches("location /").count() - text.matches("location / {").count()
}

pub fn balanced(text: &str) -> bool {
    text.matches('{').count() == text.matches('}').count()
}
