//! Deploy operation
//!
//! Packs an installed bundle once, or takes a prebuilt archive file, and
//! uploads the archive to every remote.
//! Each remote succeeds or fails on its own; one failing remote does not
//! stop the others.

use std::path::Path;

use tracing::{info, warn};

use crate::bundle::archive;
use crate::cache::{Cache, InstalledBundle, RepositoryIndex};
use crate::domain::{BundleKey, Version};
use crate::error::{GraphpackError, Result, bundle, fs};
use crate::remote::RemoteClient;

/// Upload result for one remote
#[derive(Debug)]
pub struct RemoteOutcome {
    pub remote: String,
    pub result: Result<()>,
}

#[derive(Debug)]
pub struct DeployReport {
    pub key: BundleKey,
    pub outcomes: Vec<RemoteOutcome>,
}

impl DeployReport {
    /// Names of remotes that accepted the bundle
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.remote.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &GraphpackError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.remote.as_str(), e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

pub struct Deployer<'a> {
    cache: &'a Cache,
    remotes: &'a [RemoteClient],
    index: Option<&'a RepositoryIndex>,
}

impl<'a> Deployer<'a> {
    pub fn new(cache: &'a Cache, remotes: &'a [RemoteClient]) -> Self {
        Self {
            cache,
            remotes,
            index: None,
        }
    }

    /// Invalidate a remote's listing in `index` after uploading to it
    pub fn with_index(mut self, index: &'a RepositoryIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Deploy an installed release; without a version, the highest one
    pub fn deploy(&self, id: &str, version: Option<Version>) -> Result<DeployReport> {
        let version = match version {
            Some(v) => v,
            None => self
                .cache
                .latest(id)?
                .ok_or_else(|| bundle::not_found(id, None))?,
        };
        let installed = self
            .cache
            .lookup(id, version)?
            .found()
            .ok_or_else(|| bundle::not_found(id, Some(version)))?;
        self.deploy_bundle(&installed)
    }

    pub fn deploy_bundle(&self, installed: &InstalledBundle) -> Result<DeployReport> {
        let archive = archive::pack(&installed.path)?;
        Ok(self.upload(&archive, &installed.key))
    }

    /// Deploy an archive file without installing it; the archive is
    /// verified before any remote sees it
    pub fn deploy_archive(&self, path: &Path) -> Result<DeployReport> {
        let archive = std::fs::read(path).map_err(|e| fs::read_failed(path, e))?;
        let manifest = archive::read_manifest(&archive)?;
        Ok(self.upload(&archive, &manifest.key()))
    }

    fn upload(&self, archive: &[u8], key: &BundleKey) -> DeployReport {
        let mut outcomes = Vec::with_capacity(self.remotes.len());
        for remote in self.remotes {
            let result = remote.upload(archive, key);
            match &result {
                Ok(()) => {
                    info!(key = %key, remote = remote.name(), "deployed bundle");
                    if let Some(index) = self.index {
                        index.invalidate(remote.name());
                    }
                }
                Err(e) => {
                    warn!(key = %key, remote = remote.name(), error = %e, "deploy failed");
                }
            }
            outcomes.push(RemoteOutcome {
                remote: remote.name().to_string(),
                result,
            });
        }

        DeployReport {
            key: key.clone(),
            outcomes,
        }
    }
}
