#[path = "common/mod.rs"]
mod common;

use std::{fs, sync::Arc};

use common::{Sandbox, balanced, subroute_count};
use ngsite::{error::NginxManagerError, site::SiteMode, test_utils::RecordingRunner};

#[test]
fn static_subroute_is_nested_inside_site() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(Arc::new(RecordingRunner::new()));
    manager
        .add_domain("example.com", SiteMode::Static, "/var/www/example")
        .unwrap();

    manager
        .add_subroute("example.com", "blog", SiteMode::Static, "/var/www/blog")
        .unwrap();

    let text = manager.view_domain_config("example.com").unwrap();
    assert!(text.contains("try_files $uri $uri/ =404;"));
    assert!(text.contains("root /var/www/example;"));
    assert!(text.contains("location /blog {"));
    assert!(text.contains("alias /var/www/blog;"));
    assert!(balanced(&text));

    let blog = text.find("location /blog").unwrap();
    let last_brace = text.rfind('}').unwrap();
    assert!(blog < last_brace, "sub-route must sit inside the server block");
}

#[test]
fn each_append_adds_exactly_one_fragment() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(Arc::new(RecordingRunner::new()));
    manager
        .add_domain("example.com", SiteMode::Proxy, "http://localhost:3000")
        .unwrap();

    let routes = [
        ("docs", SiteMode::Static, "/var/www/docs"),
        ("api", SiteMode::Proxy, "http://127.0.0.1:9000"),
        ("docs", SiteMode::Static, "/var/www/docs-v2"),
    ];
    for (n, (segment, mode, target)) in routes.into_iter().enumerate() {
        let before = manager.view_domain_config("example.com").unwrap();
        assert_eq!(subroute_count(&before), n);

        manager.add_subroute("example.com", segment, mode, target).unwrap();

        let after = manager.view_domain_config("example.com").unwrap();
        assert_eq!(subroute_count(&after), n + 1);
        assert!(balanced(&after));
    }

    let text = manager.view_domain_config("example.com").unwrap();
    assert_eq!(text.matches("location /docs {").count(), 2);
    assert!(text.contains("alias /var/www/docs;"));
    assert!(text.contains("alias /var/www/docs-v2;"));
    assert!(text.contains("proxy_set_header X-Forwarded-Proto $scheme;"));
}

#[test]
fn append_to_unknown_domain_is_not_found() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());

    assert!(matches!(
        manager.add_subroute("example.com", "blog", SiteMode::Static, "/var/www/blog"),
        Err(NginxManagerError::NotFound(_))
    ));
    assert!(runner.calls().is_empty());
    assert!(!sandbox.root().join("locks/example.com.lock").exists());
}

#[test]
fn rejected_subroute_keeps_rewritten_text_and_skips_reload() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());
    manager
        .add_domain("example.com", SiteMode::Static, "/var/www/example")
        .unwrap();
    assert_eq!(runner.count("reload"), 1);

    runner.set_failure("nginx -t", "duplicate location \"/blog\"");
    let err = manager
        .add_subroute("example.com", "blog", SiteMode::Static, "/var/www/blog")
        .unwrap_err();
    assert!(matches!(err, NginxManagerError::ConfigurationError { .. }));

    let text = manager.view_domain_config("example.com").unwrap();
    assert!(text.contains("location /blog {"));
    assert_eq!(runner.count("reload"), 1);
}

#[test]
fn subroute_does_not_relink() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(Arc::new(RecordingRunner::new()));
    manager
        .add_domain("example.com", SiteMode::Static, "/var/www/example")
        .unwrap();
    fs::remove_file(sandbox.enabled().join("example.com")).unwrap();

    manager
        .add_subroute("example.com", "blog", SiteMode::Static, "/var/www/blog")
        .unwrap();
    assert!(fs::symlink_metadata(sandbox.enabled().join("example.com")).is_err());
}

#[test]
fn certbot_style_record_gets_route_in_primary_block() {
    let sandbox = Sandbox::new();
    let manager = sandbox.manager(Arc::new(RecordingRunner::new()));
    let record = r#"server {
    server_name example.com;
    root /var/www/example;

    location / {
        try_files $uri $uri/ =404;
    }

    listen 443 ssl; # managed by Certbot
    ssl_certificate /etc/letsencrypt/live/example.com/fullchain.pem; # managed by Certbot
}
server {
    if ($host = example.com) {
        return 301 https://$host$request_uri;
    } # managed by Certbot

    listen 80;
    server_name example.com;
    return 404; # managed by Certbot
}
"#;
    fs::write(sandbox.available().join("example.com"), record).unwrap();

    manager
        .add_subroute("example.com", "blog", SiteMode::Static, "/var/www/blog")
        .unwrap();

    let text = manager.view_domain_config("example.com").unwrap();
    let blog = text.find("location /blog").unwrap();
    let redirect_block = text.find("server {\n    if").unwrap();
    assert!(blog < redirect_block);
    assert!(text.ends_with("    return 404; # managed by Certbot\n}\n"));
    assert!(balanced(&text));
}

#[test]
fn malformed_record_is_left_untouched() {
    let sandbox = Sandbox::new();
    let runner = Arc::new(RecordingRunner::new());
    let manager = sandbox.manager(runner.clone());
    fs::write(sandbox.available().join("example.com"), "server {\n    listen 80;\n").unwrap();

    assert!(matches!(
        manager.add_subroute("example.com", "blog", SiteMode::Static, "/var/www/blog"),
        Err(NginxManagerError::MalformedRecord { .. })
    ));
    assert_eq!(
        fs::read_to_string(sandbox.available().join("example.com")).unwrap(),
        "server {\n    listen 80;\n"
    );
    assert!(runner.calls().is_empty());
}
