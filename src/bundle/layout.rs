//! On-disk layout of an installed bundle
//!
//! ```text
//! <cache>/
//! ├── bundles/
//! │   └── <quoted id>/
//! │       └── <version>/
//! │           ├── manifest
//! │           ├── graphs/<blake3(context id)>.nt
//! │           └── files/<project-relative path>
//! └── locks/
//!     └── <quoted id>@<version>.lock
//! ```

use std::path::{Path, PathBuf};

use crate::domain::Version;
use crate::path_utils;

/// Manifest file name inside a bundle directory and archive
pub const MANIFEST_FILE: &str = "manifest";

/// Serialized graphs subdirectory
pub const GRAPHS_DIR: &str = "graphs";

/// Included files subdirectory
pub const FILES_DIR: &str = "files";

/// Extension of serialized graph files
pub const GRAPH_EXTENSION: &str = "nt";

/// Bundles subdirectory within a cache root
pub const BUNDLES_DIR: &str = "bundles";

/// Lock files subdirectory within a cache root
pub const LOCKS_DIR: &str = "locks";

/// Prefix of staging directories next to a bundle's final directory
pub const STAGING_PREFIX: &str = ".staging-";

/// Deterministic graph file name for a context identifier
pub fn graph_file_name(context: &str) -> String {
    format!(
        "{}.{}",
        blake3::hash(context.as_bytes()).to_hex(),
        GRAPH_EXTENSION
    )
}

/// Archive entry path of a graph file
pub fn graph_entry(file_name: &str) -> String {
    format!("{GRAPHS_DIR}/{file_name}")
}

/// Archive entry path of an included file
pub fn file_entry(relative: &str) -> String {
    format!("{FILES_DIR}/{relative}")
}

/// Directory holding every version of a bundle id
pub fn id_dir(root: &Path, id: &str) -> PathBuf {
    root.join(BUNDLES_DIR).join(path_utils::quote_id(id))
}

/// Directory of one installed bundle version
pub fn bundle_dir(root: &Path, id: &str, version: Version) -> PathBuf {
    id_dir(root, id).join(version.to_string())
}

/// Lock file guarding writes to one bundle version
pub fn lock_file(root: &Path, id: &str, version: Version) -> PathBuf {
    root.join(LOCKS_DIR)
        .join(format!("{}@{}.lock", path_utils::quote_id(id), version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_file_name_is_stable_and_distinct() {
        let a = graph_file_name("http://example.org/ctx");
        assert_eq!(a, graph_file_name("http://example.org/ctx"));
        assert_ne!(a, graph_file_name("http://example.org/ctx2"));
        assert!(a.ends_with(".nt"));
        assert!(path_utils::is_safe_relative(&graph_entry(&a)));
    }

    #[test]
    fn test_bundle_dir_quotes_id() {
        let dir = bundle_dir(Path::new("/cache"), "ex/a", 2);
        assert_eq!(dir, PathBuf::from("/cache/bundles/ex%2Fa/2"));
    }

    #[test]
    fn test_lock_file_per_key() {
        let root = Path::new("/cache");
        assert_ne!(lock_file(root, "ex/a", 1), lock_file(root, "ex/a", 2));
        assert_ne!(lock_file(root, "ex/a", 1), lock_file(root, "ex-a", 1));
    }
}
