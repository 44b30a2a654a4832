//! Error types and handling for graphpack
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Convenience constructors live in sub-modules by error domain:
//! - [`bundle`]: Bundle, manifest and archive errors
//! - [`config`]: Descriptor, remote and settings errors
//! - [`fs`]: File system errors
//! - [`remote`]: Accessor and remote errors

pub mod bundle;
pub mod config;
pub mod fs;
pub mod remote;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for graphpack operations
#[derive(Error, Diagnostic, Debug)]
pub enum GraphpackError {
    // Selection errors
    #[error("Descriptor for '{id}' selects no contexts")]
    #[diagnostic(
        code(graphpack::selection::empty),
        help("Check the descriptor's includes, patterns and excludes against the store contents")
    )]
    EmptySelection { id: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    #[diagnostic(code(graphpack::selection::invalid_pattern))]
    InvalidPattern { pattern: String, reason: String },

    // Bundle errors
    #[error("Bundle '{id}' version {version} is already published with different content")]
    #[diagnostic(
        code(graphpack::bundle::version_already_published),
        help("Increment the descriptor's version to publish changed content")
    )]
    VersionAlreadyPublished { id: String, version: u64 },

    #[error("Bundle '{id}' ({version}) not found")]
    #[diagnostic(
        code(graphpack::bundle::not_found),
        help("Check the bundle id, or add a remote that serves it with 'graphpack remote add'")
    )]
    BundleNotFound { id: String, version: String },

    #[error("Malformed bundle at '{path}': {reason}")]
    #[diagnostic(code(graphpack::bundle::malformed))]
    MalformedBundle { path: String, reason: String },

    #[error("Corrupt bundle content in '{path}': {reason}")]
    #[diagnostic(
        code(graphpack::archive::corrupt),
        help("The archive or bundle directory does not match its manifest; fetch it again")
    )]
    ArchiveCorrupt { path: String, reason: String },

    // Dependency errors
    #[error("Cyclic dependency detected: {chain}")]
    #[diagnostic(
        code(graphpack::deps::cyclic),
        help("Remove one of the dependencies in the cycle")
    )]
    CyclicDependency { chain: String },

    #[error("Dependency '{id}' ({version}) of '{dependent}' cannot be resolved")]
    #[diagnostic(
        code(graphpack::deps::unresolved),
        help("Install or fetch the dependency first, or fix the version in the descriptor")
    )]
    UnresolvedDependency {
        dependent: String,
        id: String,
        version: String,
    },

    // Remote errors
    #[error("Remote '{remote}' is unavailable: {reason}")]
    #[diagnostic(code(graphpack::remote::unavailable))]
    RemoteUnavailable { remote: String, reason: String },

    #[error("Accessor {accessor} failed: {reason}")]
    #[diagnostic(code(graphpack::remote::accessor_failed))]
    AccessorFailed { accessor: String, reason: String },

    #[error("Accessor {accessor} timed out")]
    #[diagnostic(code(graphpack::remote::timeout))]
    AccessorTimeout { accessor: String },

    #[error("Accessor {accessor} does not support upload")]
    #[diagnostic(code(graphpack::remote::upload_not_supported))]
    UploadNotSupported { accessor: String },

    #[error("Remote '{remote}' has no upload-capable accessor")]
    #[diagnostic(
        code(graphpack::remote::no_uploaders),
        help("Add a file, sftp or http accessor with an upload URL to the remote")
    )]
    NoUploaders { remote: String },

    #[error("Unknown remote: {name}")]
    #[diagnostic(
        code(graphpack::remote::unknown),
        help("Run 'graphpack remote list' to see configured remotes")
    )]
    UnknownRemote { name: String },

    // Configuration errors
    #[error("Invalid descriptor '{path}': {reason}")]
    #[diagnostic(code(graphpack::config::descriptor_invalid))]
    DescriptorInvalid { path: String, reason: String },

    #[error("Failed to parse configuration file: {path}")]
    #[diagnostic(code(graphpack::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(graphpack::config::read_failed))]
    ConfigReadFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(graphpack::config::invalid))]
    ConfigInvalid { message: String },

    // Store errors
    #[error("Failed to parse statements in '{path}' at line {line}: {reason}")]
    #[diagnostic(code(graphpack::store::parse_failed))]
    StoreParseFailed {
        path: String,
        line: usize,
        reason: String,
    },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(graphpack::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(graphpack::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(graphpack::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(graphpack::fs::io_error))]
    IoError { message: String },

    // Cache errors
    #[error("Cache operation failed: {message}")]
    #[diagnostic(code(graphpack::cache::operation_failed))]
    CacheOperationFailed { message: String },
}

impl From<std::io::Error> for GraphpackError {
    fn from(err: std::io::Error) -> Self {
        GraphpackError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for GraphpackError {
    fn from(err: serde_yaml::Error) -> Self {
        GraphpackError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GraphpackError {
    fn from(err: serde_json::Error) -> Self {
        GraphpackError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, GraphpackError>;

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_error_contains {
        ($test_name:ident, $err:expr, $($contains:expr),+ $(,)?) => {
            #[test]
            fn $test_name() {
                let err = $err;
                let error_string = err.to_string();
                $(
                    assert!(error_string.contains($contains),
                        "Error message should contain '{}', got: {}",
                        $contains,
                        error_string
                    );
                )+
            }
        };
    }

    #[test]
    fn test_error_display() {
        let err = GraphpackError::BundleNotFound {
            id: "ex/a".to_string(),
            version: "latest".to_string(),
        };
        assert_eq!(err.to_string(), "Bundle 'ex/a' (latest) not found");
    }

    #[test]
    fn test_error_code() {
        let err = GraphpackError::CyclicDependency {
            chain: "a@1 -> b@1 -> a@1".to_string(),
        };
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("graphpack::deps::cyclic".to_string())
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GraphpackError = io_err.into();
        assert!(matches!(err, GraphpackError::IoError { .. }));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let parse_result: std::result::Result<serde_yaml::Value, _> =
            serde_yaml::from_str("invalid: yaml: content: [unclosed");
        let err: GraphpackError = parse_result.unwrap_err().into();
        assert!(matches!(err, GraphpackError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("invalid json content");
        let err: GraphpackError = parse_result.unwrap_err().into();
        assert!(matches!(err, GraphpackError::ConfigParseFailed { .. }));
    }

    test_error_contains!(
        test_empty_selection_error,
        GraphpackError::EmptySelection {
            id: "ex/a".to_string()
        },
        "ex/a",
        "selects no contexts"
    );

    test_error_contains!(
        test_version_already_published_error,
        GraphpackError::VersionAlreadyPublished {
            id: "ex/a".to_string(),
            version: 3
        },
        "ex/a",
        "version 3",
        "already published"
    );

    test_error_contains!(
        test_unresolved_dependency_error,
        GraphpackError::UnresolvedDependency {
            dependent: "ex/a@1".to_string(),
            id: "ex/b".to_string(),
            version: "2".to_string()
        },
        "ex/b",
        "ex/a@1"
    );

    test_error_contains!(
        test_remote_unavailable_error,
        GraphpackError::RemoteUnavailable {
            remote: "origin".to_string(),
            reason: "connection refused".to_string()
        },
        "origin",
        "connection refused"
    );

    test_error_contains!(
        test_archive_corrupt_error,
        GraphpackError::ArchiveCorrupt {
            path: "ex-a.tar.gz".to_string(),
            reason: "hash mismatch for files/data.csv".to_string()
        },
        "ex-a.tar.gz",
        "hash mismatch"
    );

    #[test]
    fn test_constructors_build_expected_variants() {
        assert!(matches!(
            bundle::not_found("ex/a", None),
            GraphpackError::BundleNotFound { .. }
        ));
        assert!(matches!(
            bundle::corrupt("x", "y"),
            GraphpackError::ArchiveCorrupt { .. }
        ));
        assert!(matches!(
            config::invalid("bad"),
            GraphpackError::ConfigInvalid { .. }
        ));
        assert!(matches!(
            fs::write_failed("/tmp/x", "disk full"),
            GraphpackError::FileWriteFailed { .. }
        ));
        assert!(matches!(
            remote::accessor_failed("file:///x", "missing"),
            GraphpackError::AccessorFailed { .. }
        ));
    }
}
