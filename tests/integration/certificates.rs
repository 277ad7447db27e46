#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use common::Sandbox;
use ngsite::{
    error::NginxManagerError, runner::PrivilegeMode, site::SiteMode, test_utils::RecordingRunner,
};

#[test]
fn issue_runs_certbot_for_one_domain() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());
    manager
        .add_domain("example.com", SiteMode::Static, "/var/www/example")
        .unwrap();

    manager.issue_certificate("example.com").unwrap();
    assert_eq!(runner.count("certbot --nginx -d example.com"), 1);
}

#[test]
fn renew_reloads_even_without_changes() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());

    manager.renew_certificates().unwrap();
    manager.renew_certificates().unwrap();
    assert_eq!(
        runner.calls(),
        vec![
            "certbot renew",
            "systemctl reload nginx",
            "certbot renew",
            "systemctl reload nginx",
        ]
    );
}

#[test]
fn renewal_failure_is_reported_after_reload() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new().fail_on("certbot renew", "1 renew failure(s)"));
    let manager = sandbox.manager(runner.clone());

    match manager.renew_certificates() {
        Err(NginxManagerError::ExternalCommandError {
            command, stderr, ..
        }) => {
            assert_eq!(command, "certbot renew");
            assert!(stderr.contains("renew failure"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(runner.invoked("systemctl reload nginx"));
}

#[test]
fn escalated_config_wraps_certificate_commands() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let mut config = sandbox.config();
    config.privilege = PrivilegeMode::Always;
    config.sudo_program = "doas".to_string();
    let manager = ngsite::manager::NginxManager::with_runner(&config, runner.clone());

    manager.issue_certificate("example.com").unwrap();
    assert_eq!(runner.calls(), vec!["doas certbot --nginx -d example.com"]);
}
