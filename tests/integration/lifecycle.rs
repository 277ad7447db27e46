#[path = "common/mod.rs"]
mod common;

use std::{collections::BTreeSet, fs, sync::Arc, thread};

use common::{Sandbox, balanced};
use ngsite::{
    error::NginxManagerError, render::render_site, site::Site, site::SiteMode,
    test_utils::RecordingRunner,
};

#[test]
fn activate_list_read_deactivate_scenario() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());

    manager
        .add_domain("example.com", SiteMode::Static, "/var/www/example")
        .expect("activation failed");

    let domains = manager.list_domains().unwrap();
    assert_eq!(domains, BTreeSet::from(["example.com".to_string()]));

    let text = manager.view_domain_config("example.com").unwrap();
    assert!(text.contains("/var/www/example"));
    assert!(text.contains("example.com"));
    assert!(balanced(&text));

    manager.delete_domain("example.com").expect("deactivation failed");
    assert!(manager.list_domains().unwrap().is_empty());
    assert!(matches!(
        manager.view_domain_config("example.com"),
        Err(NginxManagerError::NotFound(_))
    ));
    assert!(!sandbox.enabled().join("example.com").exists());
}

#[test]
fn read_after_activate_returns_rendered_text() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(Arc::new(RecordingRunner::new()));
    let site = Site::new("api.example.com", SiteMode::Proxy, "http://127.0.0.1:8080");

    manager.pipeline().activate(&site).unwrap();
    assert_eq!(
        manager.view_domain_config("api.example.com").unwrap(),
        render_site(&site)
    );
}

#[test]
fn reactivation_replaces_previous_content() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(Arc::new(RecordingRunner::new()));

    manager
        .add_domain("example.com", SiteMode::Static, "/var/www/example")
        .unwrap();
    manager
        .add_domain("example.com", SiteMode::Proxy, "http://localhost:3000")
        .unwrap();

    let text = manager.view_domain_config("example.com").unwrap();
    assert_eq!(
        text,
        render_site(&Site::new("example.com", SiteMode::Proxy, "http://localhost:3000"))
    );
    assert!(!text.contains("/var/www/example"));
    assert_eq!(fs::read_dir(sandbox.enabled()).unwrap().count(), 1);
}

#[test]
fn failed_validation_leaves_files_and_never_reloads() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new().fail_on("nginx -t", "nginx: [emerg] invalid"));
    let manager = sandbox.manager(runner.clone());

    let err = manager
        .add_domain("example.com", SiteMode::Static, "/var/www/example")
        .unwrap_err();
    match err {
        NginxManagerError::ConfigurationError { domain, detail } => {
            assert_eq!(domain, "example.com");
            assert!(detail.contains("emerg"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(sandbox.available().join("example.com").is_file());
    assert!(
        fs::symlink_metadata(sandbox.enabled().join("example.com")).is_ok(),
        "enablement link should remain"
    );
    assert_eq!(runner.calls(), vec!["nginx -t"]);
    assert!(!runner.invoked("reload"));
}

#[test]
fn deactivating_unknown_domain_mutates_nothing() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());
    manager
        .add_domain("keep.example.com", SiteMode::Static, "/var/www/keep")
        .unwrap();
    let before = runner.calls().len();

    assert!(matches!(
        manager.delete_domain("example.com"),
        Err(NginxManagerError::NotFound(domain)) if domain == "example.com"
    ));
    assert_eq!(runner.calls().len(), before);
    assert_eq!(
        manager.list_domains().unwrap(),
        BTreeSet::from(["keep.example.com".to_string()])
    );
    assert_eq!(fs::read_dir(sandbox.enabled()).unwrap().count(), 1);
}

#[test]
fn list_reports_enabled_state_separately() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(Arc::new(RecordingRunner::new()));
    manager
        .add_domain("a.example.com", SiteMode::Static, "/var/www/a")
        .unwrap();
    fs::write(sandbox.available().join("b.example.com"), "server {}\n").unwrap();
    fs::create_dir(sandbox.available().join("snippets")).unwrap();

    assert_eq!(
        manager.list_domains().unwrap(),
        BTreeSet::from(["a.example.com".to_string(), "b.example.com".to_string()])
    );
    assert_eq!(
        manager.enabled_domains().unwrap(),
        BTreeSet::from(["a.example.com".to_string()])
    );
}

#[test]
fn concurrent_activations_of_one_domain_both_complete() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());

    let handles: Vec<_> = ["/var/www/one", "/var/www/two"]
        .into_iter()
        .map(|root| {
            let manager = manager.clone();
            thread::spawn(move || manager.add_domain("example.com", SiteMode::Static, root))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let text = manager.view_domain_config("example.com").unwrap();
    assert!(text.contains("/var/www/one") ^ text.contains("/var/www/two"));
    assert_eq!(runner.count("nginx -t"), 2);
    assert_eq!(runner.count("reload"), 2);
}

#[test]
fn unsafe_input_is_rejected_before_any_write() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());

    let attempts = [
        ("../../etc/nginx/nginx.conf", SiteMode::Static, "/var/www"),
        ("example.com", SiteMode::Static, "/var/www; include /etc/shadow"),
        ("example.com", SiteMode::Proxy, "localhost:3000"),
        ("", SiteMode::Static, "/var/www"),
    ];
    for (domain, mode, target) in attempts {
        assert!(matches!(
            manager.add_domain(domain, mode, target),
            Err(NginxManagerError::InvalidInput { .. })
        ));
    }
    assert!(manager.list_domains().unwrap().is_empty());
    assert!(runner.calls().is_empty());
}
