//! Context and file pattern resolution
//!
//! Context identifiers are URIs, not paths, so context globs are translated
//! to regular expressions here instead of going through a path matcher:
//!
//! - `rgx:<expr>` matches when `<expr>` matches the whole identifier
//! - a pattern containing `*`, `?` or `[` is a glob over `/`-separated
//!   segments: `*` and `?` stay within a segment, `**` crosses segments,
//!   `[!...]` negates a class
//! - anything else is a literal identifier
//!
//! File patterns are project-relative globs matched with `wax`.

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use walkdir::WalkDir;
use wax::{CandidatePath, Glob, Pattern};

use crate::config::descriptor::{Descriptor, FilesDescriptor};
use crate::domain::ContextId;
use crate::error::{GraphpackError, Result, config};
use crate::path_utils;

const REGEX_PREFIX: &str = "rgx:";

/// A compiled context pattern
#[derive(Debug, Clone)]
pub enum ContextPattern {
    Literal(String),
    Glob { source: String, regex: Regex },
    Regex { source: String, regex: Regex },
}

impl ContextPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if let Some(expr) = pattern.strip_prefix(REGEX_PREFIX) {
            let regex = compile(pattern, &format!("^(?:{expr})$"))?;
            return Ok(Self::Regex {
                source: pattern.to_string(),
                regex,
            });
        }

        if pattern.contains(['*', '?', '[']) {
            let translated =
                glob_to_regex(pattern).ok_or_else(|| GraphpackError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: "unterminated character class".to_string(),
                })?;
            let regex = compile(pattern, &translated)?;
            return Ok(Self::Glob {
                source: pattern.to_string(),
                regex,
            });
        }

        Ok(Self::Literal(pattern.to_string()))
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == id,
            Self::Glob { regex, .. } | Self::Regex { regex, .. } => regex.is_match(id),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(source) | Self::Glob { source, .. } | Self::Regex { source, .. } => {
                source
            }
        }
    }
}

fn compile(pattern: &str, expr: &str) -> Result<Regex> {
    Regex::new(expr).map_err(|e| GraphpackError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Translate a context glob into an anchored regular expression.
///
/// Returns `None` if a character class is never closed.
pub fn glob_to_regex(glob: &str) -> Option<String> {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == ']' {
                        closed = true;
                        break;
                    }
                    if matches!(ch, '\\' | '[' | '&' | '~') {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                if !closed {
                    return None;
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push('$');
    Some(out)
}

fn parse_all(patterns: &[String]) -> Result<Vec<ContextPattern>> {
    patterns.iter().map(|p| ContextPattern::parse(p)).collect()
}

/// Union of contexts matching any include, minus those matching any exclude
pub fn resolve_contexts(
    includes: &[ContextPattern],
    excludes: &[ContextPattern],
    available: &[ContextId],
) -> BTreeSet<ContextId> {
    available
        .iter()
        .filter(|ctx| includes.iter().any(|p| p.matches(ctx)))
        .filter(|ctx| !excludes.iter().any(|p| p.matches(ctx)))
        .cloned()
        .collect()
}

/// Resolve a descriptor's context selection against the store's contexts.
///
/// Contexts the descriptor declares as intentionally empty are selected even
/// though the store has no statements for them, unless excluded.
pub fn select_contexts(
    descriptor: &Descriptor,
    available: &[ContextId],
) -> Result<BTreeSet<ContextId>> {
    let mut include_sources = descriptor.includes.clone();
    include_sources.extend(descriptor.patterns.iter().cloned());
    let includes = parse_all(&include_sources)?;
    let excludes = parse_all(&descriptor.excludes)?;

    let mut selected = resolve_contexts(&includes, &excludes, available);
    for empty in &descriptor.empty_contexts {
        if !excludes.iter().any(|p| p.matches(empty)) {
            selected.insert(empty.clone());
        }
    }

    if selected.is_empty() {
        return Err(GraphpackError::EmptySelection {
            id: descriptor.id.clone(),
        });
    }
    Ok(selected)
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Glob<'_>>> {
    patterns
        .iter()
        .map(|p| {
            Glob::new(p).map_err(|e| GraphpackError::InvalidPattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Resolve file includes and patterns under `project_root`.
///
/// Returns sorted, `/`-separated paths relative to the root. Literal
/// includes must exist; pattern matches are subject to `excludes`.
pub fn resolve_files(project_root: &Path, files: &FilesDescriptor) -> Result<BTreeSet<String>> {
    let mut selected = BTreeSet::new();

    for include in &files.includes {
        if !path_utils::is_safe_relative(include) {
            return Err(config::descriptor_invalid(
                include.as_str(),
                "file includes must be relative paths inside the project",
            ));
        }
        if !project_root.join(include).is_file() {
            return Err(config::descriptor_invalid(
                include.as_str(),
                "file include does not exist in the project",
            ));
        }
        selected.insert(include.clone());
    }

    if files.patterns.is_empty() {
        return Ok(selected);
    }

    let patterns = compile_globs(&files.patterns)?;
    let excludes = compile_globs(&files.excludes)?;

    for entry in WalkDir::new(project_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let Ok(relative) = entry.path().strip_prefix(project_root) else {
            continue;
        };
        let relative = path_utils::to_forward_slashes(relative);
        let candidate = CandidatePath::from(relative.as_str());
        if patterns.iter().any(|g| g.matched(&candidate).is_some())
            && !excludes.iter().any(|g| g.matched(&candidate).is_some())
        {
            selected.insert(relative);
        }
    }

    Ok(selected)
}
