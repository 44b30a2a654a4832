//! Accessor and remote errors

use super::GraphpackError;

/// Creates an accessor failure
pub fn accessor_failed(accessor: impl Into<String>, reason: impl ToString) -> GraphpackError {
    GraphpackError::AccessorFailed {
        accessor: accessor.into(),
        reason: reason.to_string(),
    }
}

/// Creates a remote unavailable error
pub fn unavailable(remote: impl Into<String>, reason: impl Into<String>) -> GraphpackError {
    GraphpackError::RemoteUnavailable {
        remote: remote.into(),
        reason: reason.into(),
    }
}

/// Creates an unknown remote error
pub fn unknown(name: impl Into<String>) -> GraphpackError {
    GraphpackError::UnknownRemote { name: name.into() }
}
