//! Line-based N-Quads / N-Triples reading and writing
//!
//! Only tokenization is done here: a line is split into terms and a final
//! `.`; the terms themselves stay opaque. Graph files inside bundles are
//! N-Triples written in sorted order so their hashes are stable.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::warn;

use super::{MemoryStore, Statement};
use crate::domain::ContextId;
use crate::error::{GraphpackError, Result, fs};

/// Parse N-Quads text into `(context, statement)` pairs.
///
/// Triples without a graph label yield `None` as their context.
pub fn parse_nquads(text: &str, origin: &str) -> Result<Vec<(Option<ContextId>, Statement)>> {
    let mut out = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let parsed = parse_line(line).map_err(|reason| GraphpackError::StoreParseFailed {
            path: origin.to_string(),
            line: index + 1,
            reason,
        })?;
        if let Some(quad) = parsed {
            out.push(quad);
        }
    }
    Ok(out)
}

/// Parse N-Triples text; graph labels are rejected
pub fn parse_ntriples(text: &str, origin: &str) -> Result<Vec<Statement>> {
    let mut out = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some((None, statement))) => out.push(statement),
            Ok(Some((Some(_), _))) => {
                return Err(GraphpackError::StoreParseFailed {
                    path: origin.to_string(),
                    line: index + 1,
                    reason: "unexpected graph label in N-Triples".to_string(),
                });
            }
            Ok(None) => {}
            Err(reason) => {
                return Err(GraphpackError::StoreParseFailed {
                    path: origin.to_string(),
                    line: index + 1,
                    reason,
                });
            }
        }
    }
    Ok(out)
}

/// Serialize statements as sorted, de-duplicated N-Triples
pub fn write_ntriples<'a>(statements: impl IntoIterator<Item = &'a Statement>) -> String {
    let sorted: BTreeSet<&Statement> = statements.into_iter().collect();
    let mut out = String::new();
    for s in sorted {
        out.push_str(&format!("{} {} {} .\n", s.subject, s.predicate, s.object));
    }
    out
}

/// Serialize a whole store as N-Quads
pub fn write_nquads(store: &MemoryStore) -> String {
    let mut out = String::new();
    for (ctx, s) in store.quads() {
        out.push_str(&format!(
            "{} {} {} <{}> .\n",
            s.subject, s.predicate, s.object, ctx
        ));
    }
    out
}

/// Load an N-Quads file into a [`MemoryStore`]
pub fn load_store(path: &Path) -> Result<MemoryStore> {
    let text = std::fs::read_to_string(path).map_err(|e| fs::read_failed(path, e))?;
    let origin = path.display().to_string();
    let mut store = MemoryStore::new();
    let mut unlabeled = 0usize;
    for (context, statement) in parse_nquads(&text, &origin)? {
        match context {
            Some(ctx) => store.insert(&ctx, statement),
            None => unlabeled += 1,
        }
    }
    if unlabeled > 0 {
        warn!(
            path = %origin,
            count = unlabeled,
            "ignoring statements outside any named graph"
        );
    }
    Ok(store)
}

/// Write a [`MemoryStore`] to an N-Quads file
pub fn save_store(path: &Path, store: &MemoryStore) -> Result<()> {
    std::fs::write(path, write_nquads(store)).map_err(|e| fs::write_failed(path, e))
}

fn parse_line(line: &str) -> std::result::Result<Option<(Option<ContextId>, Statement)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut terms = split_terms(trimmed)?;
    if terms.last().map(String::as_str) != Some(".") {
        return Err("statement must end with '.'".to_string());
    }
    terms.pop();

    let graph = match terms.len() {
        3 => None,
        4 => terms.pop().map(|g| graph_label(&g)),
        n => return Err(format!("expected 3 or 4 terms, found {n}")),
    };

    let mut it = terms.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(subject), Some(predicate), Some(object)) => Ok(Some((
            graph,
            Statement {
                subject,
                predicate,
                object,
            },
        ))),
        _ => Err("incomplete statement".to_string()),
    }
}

fn graph_label(term: &str) -> ContextId {
    term.strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(term)
        .to_string()
}

/// Split a line into terms; a trailing `.` becomes its own term
fn split_terms(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut terms = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '#' => break,
            '.' => {
                chars.next();
                terms.push(".".to_string());
            }
            '<' => {
                let end = chars
                    .by_ref()
                    .find(|&(_, ch)| ch == '>')
                    .map(|(i, _)| i)
                    .ok_or("unterminated IRI")?;
                terms.push(line[start..=end].to_string());
            }
            '"' => {
                chars.next();
                let mut escaped = false;
                let mut end = None;
                for (i, ch) in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == '"' {
                        end = Some(i);
                        break;
                    }
                }
                let end = end.ok_or("unterminated literal")?;
                let stop = take_token(&mut chars, end + 1);
                terms.push(line[start..stop].to_string());
            }
            _ => {
                let stop = take_token(&mut chars, start);
                terms.push(line[start..stop].to_string());
            }
        }
    }

    Ok(terms)
}

/// Consume characters up to the next blank; returns the end byte offset
fn take_token(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, from: usize) -> usize {
    let mut stop = from;
    while let Some(&(i, ch)) = chars.peek() {
        if ch == ' ' || ch == '\t' {
            break;
        }
        stop = i + ch.len_utf8();
        chars.next();
    }
    stop
}
