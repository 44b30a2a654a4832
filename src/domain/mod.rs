//! Core domain types shared across the crate
//!
//! A bundle release is identified by its [`BundleKey`]: an opaque bundle id
//! plus a positive, monotonically increasing [`Version`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bundle version number. Versions start at 1.
pub type Version = u64;

/// Identifier of a named graph (a context)
pub type ContextId = String;

/// Unique key of a bundle release
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BundleKey {
    pub id: String,
    pub version: Version,
}

impl BundleKey {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

impl fmt::Display for BundleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}
