//! Path utilities for cache keys, archive names and archive entries

use std::path::{Component, Path};

/// Characters that are unsafe in filesystem paths
/// Replaced with hyphens and collapsed: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`
const PATH_UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Convert a path to a string with forward slashes
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a bundle id safe for use as a single file name.
///
/// Replaces unsafe characters (including `/`, `\`, and `:`) with hyphens,
/// collapses consecutive hyphens and trims leading/trailing ones.
/// The result is lossy; use [`quote_id`] where ids must stay distinct.
///
/// # Examples
///
/// ```
/// use graphpack::path_utils::make_path_safe;
///
/// assert_eq!(make_path_safe("ex/a"), "ex-a");
/// assert_eq!(make_path_safe("http://example.org/b"), "http-example.org-b");
/// assert_eq!(make_path_safe(":::"), "unknown");
/// ```
pub fn make_path_safe(name: &str) -> String {
    let key: String = name
        .chars()
        .map(|c| if PATH_UNSAFE_CHARS.contains(&c) { '-' } else { c })
        .collect();

    let key = key
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if key.is_empty() {
        "unknown".to_string()
    } else {
        key
    }
}

/// Percent-encode a bundle id into a reversible directory name.
///
/// Every byte outside `[A-Za-z0-9._~-]` is written as `%XX`, so `/` never
/// survives into the name.
pub fn quote_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'~' | b'-') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    // "." and ".." are not usable directory names
    if out.chars().all(|c| c == '.') {
        return out.replace('.', "%2E");
    }
    out
}

/// Reverse [`quote_id`]. Returns `None` for names that are not valid encodings.
pub fn unquote_id(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Check that a `/`-separated relative path stays inside its root.
///
/// Rejects absolute paths, `..`, `.`, empty segments and backslashes.
pub fn is_safe_relative(path: &str) -> bool {
    if path.is_empty() || path.contains('\\') || path.starts_with('/') {
        return false;
    }
    if path.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_path_safe_basic() {
        assert_eq!(make_path_safe("ex/a"), "ex-a");
        assert_eq!(make_path_safe("org/sub/repo"), "org-sub-repo");
    }

    #[test]
    fn test_make_path_safe_url_id() {
        assert_eq!(
            make_path_safe("https://example.org/bundles/core"),
            "https-example.org-bundles-core"
        );
    }

    #[test]
    fn test_make_path_safe_empty() {
        assert_eq!(make_path_safe(":::"), "unknown");
        assert_eq!(make_path_safe("---"), "unknown");
    }

    #[test]
    fn test_make_path_safe_preserves_alphanumeric() {
        assert_eq!(make_path_safe("bundle-name-123"), "bundle-name-123");
        assert_eq!(make_path_safe("Bundle_Name"), "Bundle_Name");
    }

    #[test]
    fn test_quote_id_encodes_separators() {
        assert_eq!(quote_id("ex/a"), "ex%2Fa");
        assert_eq!(quote_id("a b:c"), "a%20b%3Ac");
        assert_eq!(quote_id(".."), "%2E%2E");
    }

    #[test]
    fn test_quote_id_is_reversible() {
        for id in ["ex/a", "http://example.org/x?y=1", "plain", "ünï/cødé", ".."] {
            assert_eq!(unquote_id(&quote_id(id)).as_deref(), Some(id));
        }
    }

    #[test]
    fn test_quote_id_keeps_distinct_ids_distinct() {
        assert_ne!(quote_id("a/b"), quote_id("a-b"));
    }

    #[test]
    fn test_unquote_id_rejects_bad_escape() {
        assert_eq!(unquote_id("ab%2"), None);
        assert_eq!(unquote_id("ab%zz"), None);
    }

    #[test]
    fn test_is_safe_relative() {
        assert!(is_safe_relative("graphs/abc.nt"));
        assert!(is_safe_relative("files/data/x.csv"));
        assert!(!is_safe_relative("/etc/passwd"));
        assert!(!is_safe_relative("files/../../etc"));
        assert!(!is_safe_relative("files//x"));
        assert!(!is_safe_relative("./x"));
        assert!(!is_safe_relative("a\\b"));
        assert!(!is_safe_relative(""));
    }

    #[test]
    fn test_to_forward_slashes() {
        assert_eq!(to_forward_slashes(Path::new("C:\\Users\\file.txt")), "C:/Users/file.txt");
        assert_eq!(to_forward_slashes(Path::new("/usr/local/bin")), "/usr/local/bin");
    }
}
