//! Configuration errors

use super::GraphpackError;

/// Creates a config parse failed error
pub fn parse_failed(path: impl Into<String>, reason: impl Into<String>) -> GraphpackError {
    GraphpackError::ConfigParseFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates a config read failed error
pub fn read_failed(path: impl Into<String>, reason: impl Into<String>) -> GraphpackError {
    GraphpackError::ConfigReadFailed {
        path: path.into(),
        reason: reason.into(),
    }
}

/// Creates an invalid config error
pub fn invalid(message: impl Into<String>) -> GraphpackError {
    GraphpackError::ConfigInvalid {
        message: message.into(),
    }
}

/// Creates an invalid descriptor error
pub fn descriptor_invalid(path: impl Into<String>, reason: impl Into<String>) -> GraphpackError {
    GraphpackError::DescriptorInvalid {
        path: path.into(),
        reason: reason.into(),
    }
}
