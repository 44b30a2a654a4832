//! Remote transport layer
//!
//! A [`Remote`] has an ordered list of accessor configs. Each config is
//! turned into an [`Accessor`] that can list, fetch and (optionally) upload
//! bundle archives. [`RemoteClient`] tries accessors in declared order,
//! giving each attempt its own [`Deadline`]; the first success wins and the
//! remote only fails once every accessor has failed.

pub mod file;
pub mod http;
pub mod sftp;

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::{Listing, ListingEntry};
use crate::config::{AccessorConfig, Remote};
use crate::domain::{BundleKey, Version};
use crate::error::{GraphpackError, Result, remote};

/// Point in time after which an accessor attempt is abandoned
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    /// Time left, zero once expired
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Fail with [`GraphpackError::AccessorTimeout`] if expired
    pub fn check(&self, accessor: &str) -> Result<()> {
        if self.expired() {
            return Err(GraphpackError::AccessorTimeout {
                accessor: accessor.to_string(),
            });
        }
        Ok(())
    }
}

/// One protocol-specific way to reach a remote
pub trait Accessor: Send + Sync {
    /// Location of this accessor, without credentials
    fn describe(&self) -> String;

    /// Every archive the accessor can serve
    fn list(&self, deadline: &Deadline) -> Result<Listing>;

    /// Download one archive
    fn fetch(&self, entry: &ListingEntry, deadline: &Deadline) -> Result<Vec<u8>>;

    fn can_upload(&self) -> bool {
        false
    }

    /// Store an archive. Uploading identical content again succeeds.
    fn upload(&self, _archive: &[u8], _key: &BundleKey, _deadline: &Deadline) -> Result<()> {
        Err(GraphpackError::UploadNotSupported {
            accessor: self.describe(),
        })
    }
}

/// Version of a listed archive. Non-numeric and zero versions are
/// skipped with a warning.
pub(crate) fn listed_version(accessor: &str, id: &str, raw: &str) -> Option<Version> {
    match raw.parse::<Version>() {
        Ok(0) => {
            warn!(accessor, id, "skipping version 0 in listing");
            None
        }
        Ok(version) => Some(version),
        Err(_) => {
            warn!(accessor, id, key = raw, "skipping non-numeric version in listing");
            None
        }
    }
}

/// Build the accessor for a config
pub fn accessor_for(config: &AccessorConfig) -> Result<Box<dyn Accessor>> {
    Ok(match config {
        AccessorConfig::File { path } => Box::new(file::FileAccessor::new(path.clone())),
        AccessorConfig::Http {
            index_url,
            upload_url,
        } => Box::new(http::HttpAccessor::new(index_url.clone(), upload_url.clone())?),
        AccessorConfig::Sftp {
            host,
            port,
            user,
            path,
            password,
            identity,
            host_key,
            known_hosts,
        } => Box::new(sftp::SftpAccessor {
            host: host.clone(),
            port: *port,
            user: user.clone(),
            root: path.clone(),
            password: password.clone(),
            identity: identity.clone(),
            host_key: host_key.clone(),
            known_hosts: known_hosts.clone(),
        }),
    })
}

/// A remote with its accessors ready for use
pub struct RemoteClient {
    name: String,
    accessors: Vec<Box<dyn Accessor>>,
    timeout: Duration,
}

impl RemoteClient {
    pub fn new(remote: &Remote, timeout: Duration) -> Result<Self> {
        let accessors = remote
            .accessor_configs
            .iter()
            .map(accessor_for)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::with_accessors(remote.name.clone(), accessors, timeout))
    }

    pub fn with_accessors(
        name: impl Into<String>,
        accessors: Vec<Box<dyn Accessor>>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            accessors,
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Try `op` on each accessor in order until one succeeds
    fn first_success<T>(
        &self,
        what: &str,
        accessors: &[&dyn Accessor],
        mut op: impl FnMut(&dyn Accessor, &Deadline) -> Result<T>,
    ) -> Result<T> {
        let mut failures = Vec::new();
        for accessor in accessors {
            let deadline = Deadline::after(self.timeout);
            match op(*accessor, &deadline) {
                Ok(value) => {
                    debug!(remote = %self.name, accessor = %accessor.describe(), "{what} succeeded");
                    return Ok(value);
                }
                Err(e @ GraphpackError::VersionAlreadyPublished { .. }) => return Err(e),
                Err(e) => {
                    warn!(
                        remote = %self.name,
                        accessor = %accessor.describe(),
                        error = %e,
                        "{what} failed, trying next accessor"
                    );
                    failures.push(format!("{}: {e}", accessor.describe()));
                }
            }
        }

        let reason = if failures.is_empty() {
            "no accessors configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(remote::unavailable(&self.name, reason))
    }

    fn all(&self) -> Vec<&dyn Accessor> {
        self.accessors.iter().map(|a| &**a).collect()
    }

    pub fn list(&self) -> Result<Listing> {
        self.first_success("list", &self.all(), |a, d| a.list(d))
    }

    pub fn fetch(&self, entry: &ListingEntry) -> Result<Vec<u8>> {
        self.first_success("fetch", &self.all(), |a, d| a.fetch(entry, d))
    }

    pub fn can_upload(&self) -> bool {
        self.accessors.iter().any(|a| a.can_upload())
    }

    /// Upload through the first upload-capable accessor that succeeds
    pub fn upload(&self, archive: &[u8], key: &BundleKey) -> Result<()> {
        let uploaders: Vec<&dyn Accessor> = self
            .accessors
            .iter()
            .map(|a| &**a)
            .filter(|a| a.can_upload())
            .collect();
        if uploaders.is_empty() {
            return Err(GraphpackError::NoUploaders {
                remote: self.name.clone(),
            });
        }
        self.first_success("upload", &uploaders, |a, d| a.upload(archive, key, d))
    }
}
