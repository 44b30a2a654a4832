//! Configuration handling for graphpack
//!
//! This module contains data structures for:
//! - bundle descriptors (what a bundle captures)
//! - remotes and their accessor configs
//! - runtime settings (cache and remotes locations, timeouts)

pub mod descriptor;
pub mod remote;
pub mod settings;

// Re-export commonly used types
pub use descriptor::{DependencyDescriptor, Descriptor, FilesDescriptor};
pub use remote::{AccessorConfig, Remote, RemoteRegistry};
pub use settings::Settings;
