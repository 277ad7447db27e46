//! Site and sub-route descriptors, plus the input checks applied before rendering.
use regex::Regex;
use std::{
    fmt,
    path::{Component, Path},
    sync::OnceLock,
};
use strum_macros::{AsRefStr, EnumString};
use url::Url;

use crate::error::NginxManagerError;

/// Longest domain name accepted, per RFC 1035.
const MAX_DOMAIN_LEN: usize = 253;

/// Characters that would end a directive or open a block if interpolated verbatim.
const DIRECTIVE_BREAKERS: &[char] = &[';', '{', '}', '"', '\'', '#', '\\'];

/// How a site or sub-route answers requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SiteMode {
    /// Serve files from a directory on disk.
    Static,
    /// Forward requests to an upstream URL.
    Proxy,
}

impl fmt::Display for SiteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A named routing configuration for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Server name, also used verbatim as the record's file name.
    pub domain: String,
    /// Routing mode.
    pub mode: SiteMode,
    /// Document root for [`SiteMode::Static`], upstream URL for [`SiteMode::Proxy`].
    pub target: String,
}

impl Site {
    pub fn new(domain: impl Into<String>, mode: SiteMode, target: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            mode,
            target: target.into(),
        }
    }

    /// Rejects values that are unsafe to use as a file name or to interpolate into a block.
    pub fn validate(&self) -> Result<(), NginxManagerError> {
        validate_domain(&self.domain)?;
        validate_target(self.mode, &self.target)
    }
}

/// One nested `location` appended inside an existing site's outermost block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubrouteFragment {
    /// Path segment the location is scoped to, without the leading slash.
    pub path_segment: String,
    /// Routing mode.
    pub mode: SiteMode,
    /// Aliased directory or upstream URL.
    pub target: String,
}

impl SubrouteFragment {
    pub fn new(
        path_segment: impl Into<String>,
        mode: SiteMode,
        target: impl Into<String>,
    ) -> Self {
        Self {
            path_segment: path_segment.into(),
            mode,
            target: target.into(),
        }
    }

    pub fn validate(&self) -> Result<(), NginxManagerError> {
        validate_segment(&self.path_segment)?;
        validate_target(self.mode, &self.target)
    }
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9](?:[A-Za-z0-9_-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9_-]*[A-Za-z0-9])?)*$",
        )
        .expect("domain pattern is valid")
    })
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._~-]+(?:/[A-Za-z0-9._~-]+)*/?$")
            .expect("segment pattern is valid")
    })
}

fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> NginxManagerError {
    NginxManagerError::InvalidInput {
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Checks that `domain` is a hostname-like token safe to use as a file name.
pub fn validate_domain(domain: &str) -> Result<(), NginxManagerError> {
    if domain.is_empty() {
        return Err(invalid("domain", domain, "must not be empty"));
    }
    if domain.len() > MAX_DOMAIN_LEN {
        return Err(invalid(
            "domain",
            domain,
            format!("longer than {MAX_DOMAIN_LEN} characters"),
        ));
    }
    if !domain_pattern().is_match(domain) {
        return Err(invalid(
            "domain",
            domain,
            "only letters, digits, '-', '_' and dot-separated labels are allowed",
        ));
    }
    Ok(())
}

/// Checks a sub-route segment such as `blog` or `docs/v2`.
pub fn validate_segment(segment: &str) -> Result<(), NginxManagerError> {
    if segment.is_empty() {
        return Err(invalid("path segment", segment, "must not be empty"));
    }
    if !segment_pattern().is_match(segment) {
        return Err(invalid(
            "path segment",
            segment,
            "use letters, digits and '._~-' separated by '/', without a leading slash",
        ));
    }
    if segment.split('/').any(|part| part == "." || part == "..") {
        return Err(invalid("path segment", segment, "relative components are not allowed"));
    }
    Ok(())
}

/// Checks a target according to the mode it will be rendered for.
pub fn validate_target(mode: SiteMode, target: &str) -> Result<(), NginxManagerError> {
    if target.is_empty() {
        return Err(invalid("target", target, "must not be empty"));
    }
    if target
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || DIRECTIVE_BREAKERS.contains(&c))
    {
        return Err(invalid(
            "target",
            target,
            "whitespace, control characters and any of ; { } \" ' # \\ are not allowed",
        ));
    }

    match mode {
        SiteMode::Static => {
            let path = Path::new(target);
            if !path.is_absolute() {
                return Err(invalid("target", target, "static roots must be absolute paths"));
            }
            if path.components().any(|c| matches!(c, Component::ParentDir)) {
                return Err(invalid("target", target, "'..' components are not allowed"));
            }
        }
        SiteMode::Proxy => {
            let url = Url::parse(target)
                .map_err(|err| invalid("target", target, format!("not a valid URL: {err}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid("target", target, "proxy URLs must use http or https"));
            }
            if url.host_str().is_none() {
                return Err(invalid("target", target, "proxy URLs must name a host"));
            }
        }
    }
    Ok(())
}
