//! Filesystem accessor
//!
//! ```text
//! <root>/<quoted id>/<version>/<sanitized id>.tar.gz
//! ```
//!
//! Uploads are staged in a temporary file beside the target and linked into
//! place only if no archive exists yet, so concurrent publishers of one key
//! cannot overwrite each other.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{Accessor, Deadline, listed_version};
use crate::bundle::archive::{archive_file_name, read_manifest};
use crate::bundle::manifest::Manifest;
use crate::cache::{Listing, ListingEntry};
use crate::domain::{BundleKey, Version};
use crate::error::{GraphpackError, Result, remote};
use crate::path_utils;

#[derive(Debug, Clone)]
pub struct FileAccessor {
    root: PathBuf,
}

impl FileAccessor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of one archive under `root`
    pub fn archive_path(root: &Path, id: &str, version: Version) -> PathBuf {
        root.join(path_utils::quote_id(id))
            .join(version.to_string())
            .join(archive_file_name(id))
    }

    fn failed(&self, reason: impl ToString) -> GraphpackError {
        remote::accessor_failed(self.describe(), reason)
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| self.failed(e))? {
            let entry = entry.map_err(|e| self.failed(e))?;
            if entry.path().is_dir() {
                out.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
            }
        }
        Ok(out)
    }

    /// Accept an archive already at `target` only if it has the same content
    fn check_existing(&self, target: &Path, key: &BundleKey, manifest: &Manifest) -> Result<()> {
        let existing = std::fs::read(target).map_err(|e| self.failed(e))?;
        let existing = read_manifest(&existing)?;
        if existing.content_hash == manifest.content_hash {
            debug!(key = %key, accessor = %self.describe(), "identical archive already uploaded");
            return Ok(());
        }
        Err(GraphpackError::VersionAlreadyPublished {
            id: key.id.clone(),
            version: key.version,
        })
    }
}

/// Listing entries for the version directories of one id, keeping those
/// whose archive `exists`
pub(crate) fn layout_entries(
    accessor: &str,
    id: &str,
    versions: Vec<(String, PathBuf)>,
    exists: impl Fn(&Path) -> bool,
) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    for (name, version_dir) in versions {
        let Some(version) = listed_version(accessor, id, &name) else {
            continue;
        };
        let archive = version_dir.join(archive_file_name(id));
        if exists(&archive) {
            entries.push(ListingEntry {
                id: id.to_string(),
                version,
                locator: archive.display().to_string(),
            });
        }
    }
    entries
}

impl Accessor for FileAccessor {
    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn list(&self, deadline: &Deadline) -> Result<Listing> {
        if !self.root.is_dir() {
            return Err(self.failed("directory does not exist"));
        }

        let mut entries = Vec::new();
        for (name, id_dir) in self.read_dir(&self.root)? {
            deadline.check(&self.describe())?;
            let Some(id) = path_utils::unquote_id(&name) else {
                warn!(accessor = %self.describe(), name = %name, "skipping unrecognized directory");
                continue;
            };
            let versions = self.read_dir(&id_dir)?;
            entries.extend(layout_entries(&self.describe(), &id, versions, Path::is_file));
        }
        Ok(Listing::new(entries))
    }

    fn fetch(&self, entry: &ListingEntry, deadline: &Deadline) -> Result<Vec<u8>> {
        let path = Self::archive_path(&self.root, &entry.id, entry.version);
        let bytes = std::fs::read(&path).map_err(|e| self.failed(format!("{}: {e}", path.display())))?;
        deadline.check(&self.describe())?;
        Ok(bytes)
    }

    fn can_upload(&self) -> bool {
        true
    }

    fn upload(&self, archive: &[u8], key: &BundleKey, deadline: &Deadline) -> Result<()> {
        let manifest = read_manifest(archive)?;
        let target = Self::archive_path(&self.root, &key.id, key.version);

        if target.is_file() {
            return self.check_existing(&target, key, &manifest);
        }

        deadline.check(&self.describe())?;
        let dir = target
            .parent()
            .ok_or_else(|| self.failed(format!("{} has no parent", target.display())))?;
        std::fs::create_dir_all(dir).map_err(|e| self.failed(e))?;
        let mut staged = NamedTempFile::new_in(dir).map_err(|e| self.failed(e))?;
        staged.write_all(archive).map_err(|e| self.failed(e))?;
        staged.as_file().sync_all().map_err(|e| self.failed(e))?;

        match staged.persist_noclobber(&target) {
            Ok(_) => {
                debug!(key = %key, path = %target.display(), "uploaded archive");
                Ok(())
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                debug!(key = %key, "archive appeared during upload");
                self.check_existing(&target, key, &manifest)
            }
            Err(e) => Err(self.failed(e.error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::manifest::Manifest;
    use crate::hash;
    use tempfile::TempDir;

    fn archive_for(id: &str, version: Version, content: &[u8]) -> Vec<u8> {
        let temp = TempDir::new().unwrap();
        let mut m = Manifest::new(id, version);
        m.add_file("data.txt", hash::hash_bytes(content));
        let m = m.seal();
        std::fs::create_dir_all(temp.path().join("files")).unwrap();
        std::fs::write(temp.path().join("files/data.txt"), content).unwrap();
        m.write(temp.path()).unwrap();
        crate::bundle::archive::pack(temp.path()).unwrap()
    }

    fn deadline() -> Deadline {
        Deadline::after(std::time::Duration::from_secs(10))
    }

    #[test]
    fn test_archive_path_layout() {
        let path = FileAccessor::archive_path(Path::new("/r"), "ex/a", 2);
        assert_eq!(path, PathBuf::from("/r/ex%2Fa/2/ex-a.tar.gz"));
    }

    #[test]
    fn test_upload_list_fetch() {
        let temp = TempDir::new().unwrap();
        let accessor = FileAccessor::new(temp.path());
        let archive = archive_for("ex/a", 1, b"one");

        accessor
            .upload(&archive, &BundleKey::new("ex/a", 1), &deadline())
            .unwrap();
        accessor
            .upload(&archive_for("ex/a", 2, b"two"), &BundleKey::new("ex/a", 2), &deadline())
            .unwrap();

        let listing = accessor.list(&deadline()).unwrap();
        assert_eq!(listing.versions_of("ex/a"), vec![2, 1]);

        let entry = listing.locate("ex/a", 1).unwrap();
        assert_eq!(accessor.fetch(entry, &deadline()).unwrap(), archive);
    }

    #[test]
    fn test_reupload_identical_is_noop() {
        let temp = TempDir::new().unwrap();
        let accessor = FileAccessor::new(temp.path());
        let archive = archive_for("ex/a", 1, b"one");
        let key = BundleKey::new("ex/a", 1);

        accessor.upload(&archive, &key, &deadline()).unwrap();
        accessor.upload(&archive, &key, &deadline()).unwrap();
    }

    #[test]
    fn test_reupload_different_content_conflicts() {
        let temp = TempDir::new().unwrap();
        let accessor = FileAccessor::new(temp.path());
        let key = BundleKey::new("ex/a", 1);

        accessor
            .upload(&archive_for("ex/a", 1, b"one"), &key, &deadline())
            .unwrap();
        let err = accessor
            .upload(&archive_for("ex/a", 1, b"changed"), &key, &deadline())
            .unwrap_err();
        assert!(matches!(err, GraphpackError::VersionAlreadyPublished { .. }));
    }

    #[test]
    fn test_concurrent_uploads_publish_once() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let barrier = Arc::new(Barrier::new(6));

        let handles: Vec<_> = (0..6u8)
            .map(|i| {
                let root = root.clone();
                let barrier = Arc::clone(&barrier);
                // Pairs of threads share content
                let archive = archive_for("ex/a", 1, &[b'0' + i / 2]);
                thread::spawn(move || {
                    barrier.wait();
                    FileAccessor::new(root).upload(&archive, &BundleKey::new("ex/a", 1), &deadline())
                })
            })
            .collect();
        let results: Vec<Result<()>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert!(ok == 1 || ok == 2, "{results:?}");
        for result in &results {
            if let Err(e) = result {
                assert!(matches!(e, GraphpackError::VersionAlreadyPublished { .. }), "{e:?}");
            }
        }

        let version_dir = FileAccessor::archive_path(&root, "ex/a", 1);
        let leftovers: Vec<_> = std::fs::read_dir(version_dir.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "{leftovers:?}");
    }

    #[test]
    fn test_list_skips_zero_version() {
        let temp = TempDir::new().unwrap();
        let accessor = FileAccessor::new(temp.path());
        accessor
            .upload(&archive_for("ex/a", 1, b"one"), &BundleKey::new("ex/a", 1), &deadline())
            .unwrap();

        let zero = FileAccessor::archive_path(temp.path(), "ex/a", 0);
        std::fs::create_dir_all(zero.parent().unwrap()).unwrap();
        std::fs::copy(FileAccessor::archive_path(temp.path(), "ex/a", 1), &zero).unwrap();

        let listing = accessor.list(&deadline()).unwrap();
        assert_eq!(listing.versions_of("ex/a"), vec![1]);
    }

    #[test]
    fn test_missing_root_fails() {
        let accessor = FileAccessor::new("/nonexistent/graphpack/remote");
        assert!(matches!(
            accessor.list(&deadline()),
            Err(GraphpackError::AccessorFailed { .. })
        ));
    }
}
