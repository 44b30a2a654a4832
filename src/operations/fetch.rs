//! Fetch operation
//!
//! A fetch resolves the requested release against the cache and the
//! remotes' listings, downloading only manifests while walking the
//! dependency graph. Bundles are then installed leaves first so a dependent
//! is never in the cache without its dependencies. A failure stops the
//! fetch but keeps whatever was already installed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::bundle::archive::read_manifest;
use crate::bundle::manifest::Manifest;
use crate::cache::{Cache, InstallOutcome, InstalledBundle, Listing, RepositoryIndex};
use crate::domain::{BundleKey, Version};
use crate::error::{GraphpackError, Result, bundle};
use crate::progress::ProgressDisplay;
use crate::remote::RemoteClient;
use crate::resolver::{ManifestSource, Resolver};

/// What a fetch did
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// The requested bundle
    pub bundle: InstalledBundle,
    /// Bundles downloaded by this fetch, in install order
    pub installed: Vec<BundleKey>,
    /// Bundles that were already in the cache
    pub already_present: Vec<BundleKey>,
}

pub struct Fetcher<'a> {
    cache: &'a Cache,
    index: &'a RepositoryIndex,
    remotes: &'a [RemoteClient],
    show_progress: bool,
}

impl<'a> Fetcher<'a> {
    pub fn new(cache: &'a Cache, index: &'a RepositoryIndex, remotes: &'a [RemoteClient]) -> Self {
        Self {
            cache,
            index,
            remotes,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Fetch `id` at `version`, or at the highest version any remote lists.
    ///
    /// A release already in the cache is returned without touching the
    /// network; without a version, the highest installed version counts.
    pub fn fetch(&self, id: &str, version: Option<Version>) -> Result<FetchReport> {
        if let Some(bundle) = self.local(id, version)? {
            debug!(key = %bundle.key, "bundle found in cache, skipping remotes");
            return Ok(FetchReport {
                already_present: vec![bundle.key.clone()],
                bundle,
                installed: Vec::new(),
            });
        }

        let source = RemoteSource {
            cache: self.cache,
            remotes: self.remotes,
            listings: self.listings()?,
            archives: Mutex::new(HashMap::new()),
        };

        let version = match version {
            Some(v) => v,
            None => source
                .highest_listed(id)
                .ok_or_else(|| bundle::not_found(id, None))?,
        };
        let root = BundleKey::new(id, version);
        if source.locate_any(&root).is_none() {
            return Err(bundle::not_found(id, Some(version)));
        }

        let resolution = Resolver::new(&source).resolve(&root)?;
        debug!(key = %root, order = ?resolution.order, "resolved fetch");

        let progress = if self.show_progress {
            ProgressDisplay::new(resolution.order.len() as u64)
        } else {
            ProgressDisplay::hidden()
        };
        let result = self.install_in_order(&source, &resolution.order, &progress);
        match &result {
            Ok(_) => progress.finish(),
            Err(_) => progress.abandon(),
        }
        let (installed, already_present) = result?;

        let bundle = self
            .cache
            .lookup(id, version)?
            .found()
            .ok_or_else(|| bundle::not_found(id, Some(version)))?;
        info!(
            key = %bundle.key,
            downloaded = installed.len(),
            cached = already_present.len(),
            "fetched bundle"
        );
        Ok(FetchReport {
            bundle,
            installed,
            already_present,
        })
    }

    fn local(&self, id: &str, version: Option<Version>) -> Result<Option<InstalledBundle>> {
        let version = match version {
            Some(v) => v,
            None => match self.cache.latest(id)? {
                Some(v) => v,
                None => return Ok(None),
            },
        };
        Ok(self.cache.lookup(id, version)?.found())
    }

    /// Listings of every remote that answered, aligned with `remotes`
    fn listings(&self) -> Result<Vec<Option<Arc<Listing>>>> {
        let mut listings = Vec::with_capacity(self.remotes.len());
        let mut first_error = None;

        for remote in self.remotes {
            match self.index.get_or_refresh(remote.name(), || remote.list()) {
                Ok(indexed) => {
                    if indexed.stale {
                        warn!(remote = remote.name(), "using stale listing");
                    }
                    listings.push(Some(indexed.listing));
                }
                Err(e) => {
                    warn!(remote = remote.name(), error = %e, "remote unavailable, skipping");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    listings.push(None);
                }
            }
        }

        if listings.iter().all(Option::is_none) {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Ok(listings)
    }

    fn install_in_order(
        &self,
        source: &RemoteSource<'_>,
        order: &[BundleKey],
        progress: &ProgressDisplay,
    ) -> Result<(Vec<BundleKey>, Vec<BundleKey>)> {
        let mut installed = Vec::new();
        let mut already_present = Vec::new();

        for (i, key) in order.iter().enumerate() {
            progress.update_bundle(&key.to_string(), i + 1, order.len());

            if self.cache.contains(&key.id, key.version) {
                already_present.push(key.clone());
                progress.inc_bundle();
                continue;
            }

            let archive = source.take_archive(key)?;
            let (bundle, outcome) = self.cache.install_archive(&archive)?;
            match outcome {
                InstallOutcome::Installed => installed.push(bundle.key),
                InstallOutcome::AlreadyPresent => already_present.push(bundle.key),
            }
            progress.inc_bundle();
        }

        Ok((installed, already_present))
    }
}

/// The cache plus what the remotes list, downloading archives on demand.
///
/// Downloaded archives are kept so a release is transferred once per fetch.
struct RemoteSource<'f> {
    cache: &'f Cache,
    remotes: &'f [RemoteClient],
    listings: Vec<Option<Arc<Listing>>>,
    archives: Mutex<HashMap<BundleKey, Vec<u8>>>,
}

impl RemoteSource<'_> {
    fn listed(&self) -> impl Iterator<Item = (&RemoteClient, &Listing)> {
        self.remotes
            .iter()
            .zip(&self.listings)
            .filter_map(|(remote, listing)| Some((remote, listing.as_deref()?)))
    }

    fn highest_listed(&self, id: &str) -> Option<Version> {
        self.listed().filter_map(|(_, l)| l.latest(id)).max()
    }

    fn locate_any(&self, key: &BundleKey) -> Option<&str> {
        self.listed()
            .find(|(_, l)| l.locate(&key.id, key.version).is_some())
            .map(|(remote, _)| remote.name())
    }

    /// Download an archive from the first remote that lists and serves it
    fn download(&self, key: &BundleKey) -> Result<Option<Vec<u8>>> {
        let mut last_error = None;
        for (remote, listing) in self.listed() {
            let Some(entry) = listing.locate(&key.id, key.version) else {
                continue;
            };
            match remote.fetch(entry) {
                Ok(bytes) => {
                    debug!(key = %key, remote = remote.name(), bytes = bytes.len(), "downloaded archive");
                    return Ok(Some(bytes));
                }
                Err(e) => {
                    warn!(key = %key, remote = remote.name(), error = %e, "download failed, trying next remote");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    fn archives(&self) -> std::sync::MutexGuard<'_, HashMap<BundleKey, Vec<u8>>> {
        self.archives.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The archive of `key`, downloading it if the walk has not yet
    fn take_archive(&self, key: &BundleKey) -> Result<Vec<u8>> {
        if let Some(bytes) = self.archives().remove(key) {
            return Ok(bytes);
        }
        let bytes = self
            .download(key)?
            .ok_or_else(|| bundle::not_found(&key.id, Some(key.version)))?;
        check_key(key, &read_manifest(&bytes)?)?;
        Ok(bytes)
    }
}

fn check_key(expected: &BundleKey, manifest: &Manifest) -> Result<()> {
    if manifest.key() != *expected {
        return Err(GraphpackError::ArchiveCorrupt {
            path: expected.to_string(),
            reason: format!("archive holds {} instead", manifest.key()),
        });
    }
    Ok(())
}

impl ManifestSource for RemoteSource<'_> {
    fn versions(&self, id: &str) -> Result<Vec<Version>> {
        let mut versions = self.cache.versions(id)?;
        for (_, listing) in self.listed() {
            versions.extend(listing.versions_of(id));
        }
        versions.sort_unstable_by(|a, b| b.cmp(a));
        versions.dedup();
        Ok(versions)
    }

    fn manifest(&self, id: &str, version: Version) -> Result<Option<Manifest>> {
        if let Some(installed) = self.cache.lookup(id, version)?.found() {
            return Ok(Some(installed.manifest));
        }

        let key = BundleKey::new(id, version);
        if let Some(bytes) = self.archives().get(&key) {
            return read_manifest(bytes).map(Some);
        }

        let Some(bytes) = self.download(&key)? else {
            return Ok(None);
        };
        let manifest = read_manifest(&bytes)?;
        check_key(&key, &manifest)?;
        self.archives().insert(key, bytes);
        Ok(Some(manifest))
    }
}
