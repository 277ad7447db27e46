//! Server-block synthesis. Everything here is pure string formatting; inputs are
//! interpolated as-is and checked elsewhere.
use crate::site::{Site, SiteMode, SubrouteFragment};

/// Renders the complete server block for a site.
pub fn render_site(site: &Site) -> String {
    match site.mode {
        SiteMode::Static => format!(
            r#"
server {{
    listen 80;
    server_name {domain};

    root {root};
    index index.html index.htm;

    location / {{
        try_files $uri $uri/ =404;
    }}
}}
"#,
            domain = site.domain,
            root = site.target,
        ),
        SiteMode::Proxy => format!(
            r#"
server {{
    listen 80;
    server_name {domain};

    location / {{
        proxy_pass {upstream};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
    }}
}}
"#,
            domain = site.domain,
            upstream = site.target,
        ),
    }
}

/// Renders a nested `location` rule, indented for the body of a server block.
pub fn render_fragment(fragment: &SubrouteFragment) -> String {
    match fragment.mode {
        SiteMode::Static => format!(
            r#"
    location /{segment} {{
        alias {root};
        index index.html index.htm;
        try_files $uri $uri/ =404;
    }}
"#,
            segment = fragment.path_segment,
            root = fragment.target,
        ),
        SiteMode::Proxy => format!(
            r#"
    location /{segment} {{
        proxy_pass {upstream};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }}
"#,
            segment = fragment.path_segment,
            upstream = fragment.target,
        ),
    }
}
