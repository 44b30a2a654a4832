//! Bundle, manifest and archive errors

use super::GraphpackError;

/// Creates a bundle not found error; `None` means "latest"
pub fn not_found(id: impl Into<String>, version: Option<u64>) -> GraphpackError {
    GraphpackError::BundleNotFound {
        id: id.into(),
        version: version.map_or_else(|| "latest".to_string(), |v| v.to_string()),
    }
}

/// Creates a malformed bundle error
pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> GraphpackError {
    GraphpackError::MalformedBundle {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an archive/content corruption error
pub fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> GraphpackError {
    GraphpackError::ArchiveCorrupt {
        path: path.into(),
        reason: reason.into(),
    }
}
