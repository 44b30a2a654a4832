//! High-level operations against remotes
//!
//! - [`Fetcher`]: download a bundle and its dependencies into the cache
//! - [`Deployer`]: pack an installed bundle and upload it to remotes
//!
//! Both take the cache, the listing index and the remote clients as plain
//! values so callers decide their lifetime.

pub mod deploy;
pub mod fetch;

pub use deploy::{DeployReport, Deployer, RemoteOutcome};
pub use fetch::{FetchReport, Fetcher};
