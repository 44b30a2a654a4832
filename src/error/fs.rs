//! File system errors

use std::path::Path;

use super::GraphpackError;

/// Creates a file not found error
pub fn not_found(path: impl AsRef<Path>) -> GraphpackError {
    GraphpackError::FileNotFound {
        path: path.as_ref().display().to_string(),
    }
}

/// Creates a file read failed error
pub fn read_failed(path: impl AsRef<Path>, reason: impl ToString) -> GraphpackError {
    GraphpackError::FileReadFailed {
        path: path.as_ref().display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates a file write failed error
pub fn write_failed(path: impl AsRef<Path>, reason: impl ToString) -> GraphpackError {
    GraphpackError::FileWriteFailed {
        path: path.as_ref().display().to_string(),
        reason: reason.to_string(),
    }
}

/// Creates a cache operation failed error
pub fn cache_failed(message: impl Into<String>) -> GraphpackError {
    GraphpackError::CacheOperationFailed {
        message: message.into(),
    }
}
