//! graphpack - versioned bundles of named graphs
//!
//! Producers capture a selection of contexts from a statement store, plus
//! project files, into an immutable bundle identified by id and version.
//! Bundles are cached locally, published to remotes and fetched back with
//! their dependencies.

pub mod bundle;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod hash;
pub mod installer;
pub mod operations;
pub mod path_utils;
pub mod pattern;
pub mod progress;
pub mod remote;
pub mod resolver;
pub mod store;

pub use bundle::Bundle;
pub use cache::Cache;
pub use config::{Descriptor, Settings};
pub use error::{GraphpackError, Result};
pub use installer::Installer;
pub use operations::{Deployer, Fetcher};
