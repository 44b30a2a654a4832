//! Local bundle cache
//!
//! Maps `(bundle id, version)` to an installed bundle directory. The cache
//! root is explicit state: it is opened once and handed to the installer,
//! fetcher and deployer, so tests can use one root per test.
//!
//! ## Cache Structure
//!
//! ```text
//! <root>/
//! ├── bundles/<quoted id>/<version>/{manifest,graphs/,files/}
//! └── locks/<quoted id>@<version>.lock
//! ```
//!
//! All writes go through [`Cache::install`]: the key lock is taken, the
//! bundle is staged in a sibling directory, verified against its manifest
//! and renamed into place. Writes to different keys do not contend.

pub mod index;
pub mod lock;
pub mod staging;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::bundle::archive::ArchiveContents;
use crate::bundle::layout;
use crate::bundle::manifest::Manifest;
use crate::domain::{BundleKey, Version};
use crate::error::{GraphpackError, Result, fs as fs_err};
use crate::path_utils;
use crate::resolver::ManifestSource;

pub use index::{IndexedListing, Listing, ListingEntry, RepositoryIndex};
pub use lock::KeyLock;
pub use staging::StagingDir;

/// A bundle present in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBundle {
    pub key: BundleKey,
    pub path: PathBuf,
    pub manifest: Manifest,
}

/// Result of a cache lookup; absence is not an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Found(InstalledBundle),
    NotFound,
}

impl CacheLookup {
    pub fn found(self) -> Option<InstalledBundle> {
        match self {
            Self::Found(bundle) => Some(bundle),
            Self::NotFound => None,
        }
    }
}

/// What an install did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The bundle was written
    Installed,
    /// Identical content was already installed; nothing changed
    AlreadyPresent,
}

#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// Open (and create if needed) a cache rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [root.join(layout::BUNDLES_DIR), root.join(layout::LOCKS_DIR)] {
            fs::create_dir_all(&dir).map_err(|e| fs_err::write_failed(&dir, e))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle_path(&self, id: &str, version: Version) -> PathBuf {
        layout::bundle_dir(&self.root, id, version)
    }

    /// Take the write lock of a key
    pub fn lock(&self, id: &str, version: Version) -> Result<KeyLock> {
        KeyLock::acquire(&layout::lock_file(&self.root, id, version))
    }

    /// Look up an installed bundle
    pub fn lookup(&self, id: &str, version: Version) -> Result<CacheLookup> {
        let path = self.bundle_path(id, version);
        if !path.is_dir() {
            return Ok(CacheLookup::NotFound);
        }
        let manifest = Manifest::load(&path)?;
        if manifest.id != id || manifest.version != version {
            return Err(crate::error::bundle::malformed(
                path.display().to_string(),
                format!(
                    "manifest describes {} but directory holds {id}@{version}",
                    manifest.key()
                ),
            ));
        }
        Ok(CacheLookup::Found(InstalledBundle {
            key: BundleKey::new(id, version),
            path,
            manifest,
        }))
    }

    pub fn contains(&self, id: &str, version: Version) -> bool {
        self.bundle_path(id, version).join(layout::MANIFEST_FILE).is_file()
    }

    /// Installed versions of `id`, highest first
    pub fn versions(&self, id: &str) -> Result<Vec<Version>> {
        let dir = layout::id_dir(&self.root, id);
        Self::version_dirs(&dir)
    }

    fn version_dirs(dir: &Path) -> Result<Vec<Version>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| fs_err::read_failed(dir, e))? {
            let entry = entry.map_err(|e| fs_err::read_failed(dir, e))?;
            let name = entry.file_name();
            let Some(version) = name.to_str().and_then(|n| n.parse::<Version>().ok()) else {
                continue;
            };
            if version > 0 && entry.path().join(layout::MANIFEST_FILE).is_file() {
                versions.push(version);
            }
        }
        versions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(versions)
    }

    /// Highest installed version of `id`
    pub fn latest(&self, id: &str) -> Result<Option<Version>> {
        Ok(self.versions(id)?.into_iter().next())
    }

    /// Every installed bundle, by id and then highest version first.
    ///
    /// Directories that are not valid bundles are skipped with a warning.
    pub fn list(&self) -> Result<Vec<InstalledBundle>> {
        let bundles_dir = self.root.join(layout::BUNDLES_DIR);
        if !bundles_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&bundles_dir).map_err(|e| fs_err::read_failed(&bundles_dir, e))? {
            let entry = entry.map_err(|e| fs_err::read_failed(&bundles_dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            match path_utils::unquote_id(&name) {
                Some(id) => ids.push(id),
                None => warn!(name = %name, "skipping unrecognized cache entry"),
            }
        }
        ids.sort();

        let mut bundles = Vec::new();
        for id in ids {
            for version in self.versions(&id)? {
                match self.lookup(&id, version) {
                    Ok(CacheLookup::Found(bundle)) => bundles.push(bundle),
                    Ok(CacheLookup::NotFound) => {}
                    Err(e) => warn!(id = %id, version, error = %e, "skipping malformed bundle"),
                }
            }
        }
        Ok(bundles)
    }

    /// Install a bundle described by `manifest`.
    ///
    /// `populate` writes graph and file content into the staging directory;
    /// the manifest itself is written here. Installing content identical to
    /// an installed bundle is a no-op; different content under an installed
    /// key is a [`GraphpackError::VersionAlreadyPublished`] error.
    pub fn install<F>(&self, manifest: &Manifest, populate: F) -> Result<(InstalledBundle, InstallOutcome)>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let target = self.bundle_path(&manifest.id, manifest.version);
        manifest
            .check()
            .map_err(|reason| crate::error::bundle::malformed(target.display().to_string(), reason))?;

        let _lock = self.lock(&manifest.id, manifest.version)?;

        if let CacheLookup::Found(existing) = self.lookup(&manifest.id, manifest.version)? {
            if existing.manifest.content_hash == manifest.content_hash {
                debug!(key = %existing.key, "identical bundle already installed");
                return Ok((existing, InstallOutcome::AlreadyPresent));
            }
            return Err(GraphpackError::VersionAlreadyPublished {
                id: manifest.id.clone(),
                version: manifest.version,
            });
        }

        let staging = StagingDir::create(&target)?;
        populate(staging.path())?;
        manifest.write(staging.path())?;
        manifest.verify_dir(staging.path())?;
        staging.commit()?;

        info!(key = %manifest.key(), path = %target.display(), "installed bundle");
        Ok((
            InstalledBundle {
                key: manifest.key(),
                path: target,
                manifest: manifest.clone(),
            },
            InstallOutcome::Installed,
        ))
    }

    /// Verify and install a bundle archive
    pub fn install_archive(&self, archive: &[u8]) -> Result<(InstalledBundle, InstallOutcome)> {
        let contents = ArchiveContents::read(archive)?;
        self.install(&contents.manifest, |dir| contents.write_to(dir))
    }

    /// Remove an installed bundle. Returns `false` if it was not installed.
    pub fn evict(&self, id: &str, version: Version) -> Result<bool> {
        let lock = self.lock(id, version)?;
        let path = self.bundle_path(id, version);
        if !path.is_dir() {
            lock.remove();
            return Ok(false);
        }
        fs::remove_dir_all(&path).map_err(|e| fs_err::write_failed(&path, e))?;

        let id_dir = layout::id_dir(&self.root, id);
        if fs::read_dir(&id_dir).is_ok_and(|mut entries| entries.next().is_none()) {
            let _ = fs::remove_dir(&id_dir);
        }
        lock.remove();
        info!(id, version, "evicted bundle");
        Ok(true)
    }
}

impl ManifestSource for Cache {
    fn versions(&self, id: &str) -> Result<Vec<Version>> {
        Cache::versions(self, id)
    }

    fn manifest(&self, id: &str, version: Version) -> Result<Option<Manifest>> {
        Ok(self.lookup(id, version)?.found().map(|b| b.manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;
    use tempfile::TempDir;

    fn manifest_with_file(id: &str, version: Version, content: &[u8]) -> Manifest {
        let mut m = Manifest::new(id, version);
        m.add_file("data.txt", hash::hash_bytes(content));
        m.seal()
    }

    fn install_file(cache: &Cache, id: &str, version: Version, content: &'static [u8]) -> Result<(InstalledBundle, InstallOutcome)> {
        let manifest = manifest_with_file(id, version, content);
        cache.install(&manifest, |dir| {
            std::fs::create_dir_all(dir.join("files")).unwrap();
            std::fs::write(dir.join("files/data.txt"), content).unwrap();
            Ok(())
        })
    }

    #[test]
    fn test_lookup_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();
        assert_eq!(cache.lookup("ex/a", 1).unwrap(), CacheLookup::NotFound);
    }

    #[test]
    fn test_install_and_lookup() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();

        let (bundle, outcome) = install_file(&cache, "ex/a", 1, b"hello").unwrap();
        assert_eq!(outcome, InstallOutcome::Installed);
        assert!(bundle.path.join("files/data.txt").is_file());

        let found = cache.lookup("ex/a", 1).unwrap().found().unwrap();
        assert_eq!(found.manifest, bundle.manifest);
        assert!(cache.contains("ex/a", 1));
    }

    #[test]
    fn test_reinstall_identical_is_noop() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();

        install_file(&cache, "ex/a", 1, b"hello").unwrap();
        let (_, outcome) = install_file(&cache, "ex/a", 1, b"hello").unwrap();
        assert_eq!(outcome, InstallOutcome::AlreadyPresent);
    }

    #[test]
    fn test_reinstall_different_content_fails() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();

        install_file(&cache, "ex/a", 1, b"hello").unwrap();
        let err = install_file(&cache, "ex/a", 1, b"changed").unwrap_err();
        assert!(matches!(err, GraphpackError::VersionAlreadyPublished { .. }));
        assert_eq!(
            std::fs::read(cache.bundle_path("ex/a", 1).join("files/data.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_failed_populate_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();
        let manifest = manifest_with_file("ex/a", 1, b"hello");

        let result = cache.install(&manifest, |dir| {
            std::fs::create_dir_all(dir.join("files")).unwrap();
            std::fs::write(dir.join("files/data.txt"), b"wrong").unwrap();
            Ok(())
        });
        assert!(matches!(result, Err(GraphpackError::ArchiveCorrupt { .. })));
        assert_eq!(cache.lookup("ex/a", 1).unwrap(), CacheLookup::NotFound);
        assert!(cache.versions("ex/a").unwrap().is_empty());
    }

    #[test]
    fn test_versions_latest_and_list() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();

        install_file(&cache, "ex/a", 1, b"1").unwrap();
        install_file(&cache, "ex/a", 3, b"3").unwrap();
        install_file(&cache, "ex/b", 2, b"2").unwrap();

        assert_eq!(cache.versions("ex/a").unwrap(), vec![3, 1]);
        assert_eq!(cache.latest("ex/a").unwrap(), Some(3));
        assert_eq!(cache.latest("ex/none").unwrap(), None);

        let keys: Vec<String> = cache.list().unwrap().iter().map(|b| b.key.to_string()).collect();
        assert_eq!(keys, vec!["ex/a@3", "ex/a@1", "ex/b@2"]);
    }

    #[test]
    fn test_list_skips_malformed() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();
        install_file(&cache, "ex/a", 1, b"1").unwrap();

        let bogus = cache.bundle_path("ex/bogus", 1);
        std::fs::create_dir_all(&bogus).unwrap();
        std::fs::write(bogus.join("manifest"), "not json").unwrap();

        assert_eq!(cache.list().unwrap().len(), 1);
    }

    #[test]
    fn test_evict() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();
        install_file(&cache, "ex/a", 1, b"1").unwrap();

        assert!(cache.evict("ex/a", 1).unwrap());
        assert!(!cache.evict("ex/a", 1).unwrap());
        assert_eq!(cache.lookup("ex/a", 1).unwrap(), CacheLookup::NotFound);
        assert!(!layout::lock_file(temp.path(), "ex/a", 1).exists());
    }

    #[test]
    fn test_evicted_version_can_be_reinstalled_with_new_content() {
        let temp = TempDir::new().unwrap();
        let cache = Cache::open(temp.path()).unwrap();
        install_file(&cache, "ex/a", 1, b"1").unwrap();
        cache.evict("ex/a", 1).unwrap();
        let (_, outcome) = install_file(&cache, "ex/a", 1, b"other").unwrap();
        assert_eq!(outcome, InstallOutcome::Installed);
    }
}
