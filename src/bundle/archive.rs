//! Deterministic bundle archives
//!
//! An archive is a gzip-compressed tar stream holding `manifest` first, then
//! the graph files, then the included files, each group in sorted order.
//! Every header is normalized (mode 0644, mtime/uid/gid 0) so the same
//! bundle always packs to the same bytes.
//!
//! Reading is strict: only regular files with safe relative paths are
//! accepted, the entry set must equal the manifest's, and every hash is
//! checked before anything reaches the filesystem.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Builder, EntryType, Header};
use tracing::debug;

use super::layout;
use super::manifest::Manifest;
use crate::cache::StagingDir;
use crate::error::{Result, bundle, fs};
use crate::hash;
use crate::path_utils;

/// Archive file extension
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

const ARCHIVE_ORIGIN: &str = "<archive>";

/// File name of a bundle's archive, e.g. `ex-a.tar.gz`
pub fn archive_file_name(id: &str) -> String {
    format!("{}.{}", path_utils::make_path_safe(id), ARCHIVE_EXTENSION)
}

/// Pack an installed bundle directory.
///
/// The directory is verified against its manifest first; a bundle that does
/// not verify is never packed.
pub fn pack(dir: &Path) -> Result<Vec<u8>> {
    let manifest = Manifest::load(dir)?;
    manifest.verify_dir(dir)?;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);

    for entry in manifest.entry_paths() {
        let path = dir.join(&entry);
        let data = std::fs::read(&path).map_err(|e| fs::read_failed(&path, e))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_size(data.len() as u64);
        builder
            .append_data(&mut header, &entry, data.as_slice())
            .map_err(|e| fs::write_failed(&path, e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| fs::write_failed(dir, e))?;
    let bytes = encoder.finish().map_err(|e| fs::write_failed(dir, e))?;
    debug!(key = %manifest.key(), size = bytes.len(), "packed bundle");
    Ok(bytes)
}

/// Verified contents of an archive, held in memory
#[derive(Debug, Clone)]
pub struct ArchiveContents {
    pub manifest: Manifest,
    /// Entry bytes keyed by entry name, excluding the manifest
    pub entries: BTreeMap<String, Vec<u8>>,
}

impl ArchiveContents {
    /// Decode and verify an archive
    pub fn read(archive: &[u8]) -> Result<Self> {
        let mut raw = read_entries(archive)?;

        let manifest_bytes = raw
            .remove(layout::MANIFEST_FILE)
            .ok_or_else(|| bundle::corrupt(ARCHIVE_ORIGIN, "archive has no manifest"))?;
        let manifest = archived_manifest(&manifest_bytes)?;

        let expected = manifest.entry_hashes();
        for name in raw.keys() {
            if !expected.contains_key(name) {
                return Err(bundle::corrupt(
                    ARCHIVE_ORIGIN,
                    format!("unexpected entry {name}"),
                ));
            }
        }
        for (name, expected_hash) in &expected {
            let data = raw.get(name).ok_or_else(|| {
                bundle::corrupt(ARCHIVE_ORIGIN, format!("missing entry {name}"))
            })?;
            if !hash::verify_hash(expected_hash, &hash::hash_bytes(data)) {
                return Err(bundle::corrupt(
                    ARCHIVE_ORIGIN,
                    format!("hash mismatch for {name}"),
                ));
            }
        }

        Ok(Self {
            manifest,
            entries: raw,
        })
    }

    /// Write every entry (without the manifest) under `dir`
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for (name, data) in &self.entries {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| fs::write_failed(parent, e))?;
            }
            std::fs::write(&path, data).map_err(|e| fs::write_failed(&path, e))?;
        }
        Ok(())
    }
}

/// Parse an archived manifest. An unsupported format version is a
/// malformed bundle; anything else that fails to parse or check means the
/// archive itself is corrupt.
fn archived_manifest(bytes: &[u8]) -> Result<Manifest> {
    let manifest: Manifest = serde_json::from_slice(bytes)
        .map_err(|e| bundle::corrupt(ARCHIVE_ORIGIN, format!("invalid manifest: {e}")))?;
    manifest
        .check_format()
        .map_err(|reason| bundle::malformed(ARCHIVE_ORIGIN, reason))?;
    manifest
        .check()
        .map_err(|reason| bundle::corrupt(ARCHIVE_ORIGIN, reason))?;
    Ok(manifest)
}

fn read_entries(archive: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let corrupt = |reason: String| bundle::corrupt(ARCHIVE_ORIGIN, reason);

    // Decompress fully first so the gzip checksum is verified
    let mut raw = Vec::new();
    GzDecoder::new(archive)
        .read_to_end(&mut raw)
        .map_err(|e| corrupt(format!("unreadable archive: {e}")))?;

    let mut tar = tar::Archive::new(raw.as_slice());
    let mut entries = BTreeMap::new();

    for entry in tar
        .entries()
        .map_err(|e| corrupt(format!("unreadable archive: {e}")))?
    {
        let mut entry = entry.map_err(|e| corrupt(format!("unreadable entry: {e}")))?;
        let entry_type = entry.header().entry_type();
        let name = std::str::from_utf8(&entry.path_bytes())
            .map_err(|_| corrupt("entry name is not UTF-8".to_string()))?
            .trim_end_matches('/')
            .to_string();

        if entry_type.is_dir() {
            continue;
        }
        if entry_type != EntryType::Regular {
            return Err(corrupt(format!("entry {name} is not a regular file")));
        }
        if !path_utils::is_safe_relative(&name) {
            return Err(corrupt(format!("unsafe entry path {name}")));
        }

        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| corrupt(format!("truncated entry {name}: {e}")))?;
        if entries.insert(name.clone(), data).is_some() {
            return Err(corrupt(format!("duplicate entry {name}")));
        }
    }

    Ok(entries)
}

/// Read just the manifest of an archive, verifying the whole archive
pub fn read_manifest(archive: &[u8]) -> Result<Manifest> {
    Ok(ArchiveContents::read(archive)?.manifest)
}

/// Unpack an archive into `target`, which must not exist yet.
///
/// Content is staged next to `target` and only renamed into place once it
/// verifies; on any failure nothing is left behind.
pub fn unpack(archive: &[u8], target: &Path) -> Result<Manifest> {
    let contents = ArchiveContents::read(archive)?;
    let staging = StagingDir::create(target)?;
    contents.write_to(staging.path())?;
    contents.manifest.write(staging.path())?;
    contents.manifest.verify_dir(staging.path())?;
    staging.commit()?;
    Ok(contents.manifest)
}

/// Write raw bytes to an archive file, creating parent directories
pub fn write_archive(path: &Path, archive: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| fs::write_failed(parent, e))?;
    }
    let mut file = std::fs::File::create(path).map_err(|e| fs::write_failed(path, e))?;
    file.write_all(archive).map_err(|e| fs::write_failed(path, e))?;
    file.sync_all().map_err(|e| fs::write_failed(path, e))
}
