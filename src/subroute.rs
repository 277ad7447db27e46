//! Appending `location` fragments to existing site records.
//!
//! The record is treated as text. The only structure recognised is brace nesting,
//! so that a fragment lands inside the first top-level block right before that
//! block's closing brace. Everything else in the file is preserved byte for byte.
use tracing::info;

use crate::{
    error::NginxManagerError,
    lock::SiteLock,
    pipeline::{ActivationPipeline, ActivationReport},
    render::render_fragment,
    site::{SubrouteFragment, validate_domain},
};

/// Why a record could not be spliced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceError {
    /// The text contains no `{ ... }` block at all.
    NoBlock,
    /// A `}` appeared with no open block, at the given byte offset.
    UnexpectedClose(usize),
    /// The first block is never closed.
    Unclosed,
}

impl std::fmt::Display for SpliceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpliceError::NoBlock => write!(f, "no server block found"),
            SpliceError::UnexpectedClose(offset) => {
                write!(f, "unmatched '}}' at byte {offset}")
            }
            SpliceError::Unclosed => write!(f, "server block is never closed"),
        }
    }
}

/// Byte offset of the `}` closing the first top-level block of `text`.
///
/// Braces inside `#` comments, quoted strings and `${var}` interpolations are ignored.
/// As in nginx, `#` and quotes only open a comment or string at the start of a token;
/// inside a word such as `https://host/#/app` or `it's` they are literal.
pub fn locate_block_end(text: &str) -> Result<usize, SpliceError> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut seen_block = false;
    let mut token_start = true;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        match byte {
            b'#' if token_start => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'"' | b'\'' if token_start => {
                i += 1;
                while i < bytes.len() && bytes[i] != byte {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                while i < bytes.len() && bytes[i] != b'}' {
                    i += 1;
                }
            }
            b'{' => {
                depth += 1;
                seen_block = true;
            }
            b'}' => {
                if depth == 0 {
                    return Err(SpliceError::UnexpectedClose(i));
                }
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        token_start = matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b';' | b'{' | b'}');
        i += 1;
    }

    if seen_block {
        Err(SpliceError::Unclosed)
    } else {
        Err(SpliceError::NoBlock)
    }
}

/// Returns `text` with `fragment` inserted immediately before the closing brace of
/// its first top-level block.
pub fn splice_fragment(text: &str, fragment: &str) -> Result<String, SpliceError> {
    let end = locate_block_end(text)?;
    let mut spliced = String::with_capacity(text.len() + fragment.len());
    spliced.push_str(&text[..end]);
    spliced.push_str(fragment);
    spliced.push_str(&text[end..]);
    Ok(spliced)
}

/// Appends fragments to records through an [`ActivationPipeline`].
pub struct SubrouteMutator<'a> {
    pipeline: &'a ActivationPipeline,
}

impl<'a> SubrouteMutator<'a> {
    pub fn new(pipeline: &'a ActivationPipeline) -> Self {
        Self { pipeline }
    }

    /// Inserts `fragment` into the record for `domain`, rewrites it, then validates
    /// and reloads.
    ///
    /// The record is not re-linked. If validation fails the rewritten text stays on
    /// disk and [`NginxManagerError::ConfigurationError`] is returned.
    pub fn append_fragment(
        &self,
        domain: &str,
        fragment: &SubrouteFragment,
    ) -> Result<ActivationReport, NginxManagerError> {
        validate_domain(domain)?;
        fragment.validate()?;

        let store = self.pipeline.store();
        if !store.exists(domain)? {
            return Err(NginxManagerError::NotFound(domain.to_string()));
        }
        let _domain_lock = SiteLock::acquire(self.pipeline.lock_dir(), domain)?;

        let current = store.read(domain)?;
        let rendered = render_fragment(fragment);
        let updated = splice_fragment(&current, &rendered).map_err(|err| {
            NginxManagerError::MalformedRecord {
                domain: domain.to_string(),
                reason: err.to_string(),
            }
        })?;

        store.write(domain, &updated)?;
        let report = self.pipeline.validate_and_reload(domain)?;
        info!(
            "Added /{} ({} mode) to {domain}",
            fragment.path_segment, fragment.mode
        );
        Ok(report)
    }
}
