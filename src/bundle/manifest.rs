//! Bundle manifest
//!
//! The manifest is the unit of integrity verification. It records every
//! captured context with its graph file and hash, every included file with
//! its hash, and the concrete dependency versions. `content_hash` covers
//! all of that (but not the free-text name and description), so two
//! manifests with equal content hashes describe identical bundle content.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::layout;
use crate::domain::{BundleKey, ContextId, Version};
use crate::error::{Result, bundle, fs};
use crate::hash;
use crate::path_utils;

/// Current manifest format version
pub const MANIFEST_VERSION: u32 = 1;

/// A captured context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub id: ContextId,
    /// Graph file name under `graphs/`
    pub file: String,
    pub hash: String,
}

/// An included file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// `/`-separated path under `files/`
    pub path: String,
    pub hash: String,
}

/// A dependency pinned to a concrete version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDependency {
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<ContextId>,
}

impl ManifestDependency {
    pub fn key(&self) -> BundleKey {
        BundleKey::new(self.id.clone(), self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest_version: u32,
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub contexts: Vec<ContextEntry>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub dependencies: Vec<ManifestDependency>,
    #[serde(default)]
    pub content_hash: String,
}

impl Manifest {
    /// Start an empty manifest; call [`Manifest::seal`] once populated
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            manifest_version: MANIFEST_VERSION,
            id: id.into(),
            version,
            name: None,
            description: None,
            contexts: Vec::new(),
            files: Vec::new(),
            dependencies: Vec::new(),
            content_hash: String::new(),
        }
    }

    /// Record a serialized context
    pub fn add_context(&mut self, id: impl Into<String>, hash: impl Into<String>) {
        let id = id.into();
        self.contexts.push(ContextEntry {
            file: layout::graph_file_name(&id),
            id,
            hash: hash.into(),
        });
    }

    pub fn add_file(&mut self, path: impl Into<String>, hash: impl Into<String>) {
        self.files.push(FileEntry {
            path: path.into(),
            hash: hash.into(),
        });
    }

    pub fn add_dependency(&mut self, dependency: ManifestDependency) {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
    }

    /// Sort entries and compute the content hash
    #[must_use]
    pub fn seal(mut self) -> Self {
        self.contexts.sort_by(|a, b| a.id.cmp(&b.id));
        self.contexts.dedup_by(|a, b| a.id == b.id);
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        self.files.dedup_by(|a, b| a.path == b.path);
        self.content_hash = self.compute_content_hash();
        self
    }

    pub fn key(&self) -> BundleKey {
        BundleKey::new(self.id.clone(), self.version)
    }

    pub fn context_ids(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(|c| c.id.as_str())
    }

    /// Graph file name of a captured context
    pub fn context_file(&self, context: &str) -> Option<&str> {
        self.contexts
            .iter()
            .find(|c| c.id == context)
            .map(|c| c.file.as_str())
    }

    /// Hash over contexts, files and dependencies
    pub fn compute_content_hash(&self) -> String {
        let mut records: Vec<Vec<String>> = vec![
            vec!["manifest_version".into(), self.manifest_version.to_string()],
            vec!["id".into(), self.id.clone()],
            vec!["version".into(), self.version.to_string()],
        ];
        for c in &self.contexts {
            records.push(vec![
                "context".into(),
                c.id.clone(),
                c.file.clone(),
                c.hash.clone(),
            ]);
        }
        for f in &self.files {
            records.push(vec!["file".into(), f.path.clone(), f.hash.clone()]);
        }
        for d in &self.dependencies {
            let mut record = vec!["dependency".into(), d.id.clone(), d.version.to_string()];
            record.extend(d.excludes.iter().cloned());
            records.push(record);
        }
        hash::hash_records(records.iter().map(|r| r.iter().map(String::as_str)))
    }

    /// Archive entry names in packing order: manifest, graphs, files
    pub fn entry_paths(&self) -> Vec<String> {
        let mut graphs: Vec<String> = self
            .contexts
            .iter()
            .map(|c| layout::graph_entry(&c.file))
            .collect();
        graphs.sort();
        let mut files: Vec<String> = self
            .files
            .iter()
            .map(|f| layout::file_entry(&f.path))
            .collect();
        files.sort();

        let mut entries = vec![layout::MANIFEST_FILE.to_string()];
        entries.extend(graphs);
        entries.extend(files);
        entries
    }

    /// Expected hash of every non-manifest entry, keyed by entry name
    pub fn entry_hashes(&self) -> BTreeMap<String, &str> {
        let mut hashes = BTreeMap::new();
        for c in &self.contexts {
            hashes.insert(layout::graph_entry(&c.file), c.hash.as_str());
        }
        for f in &self.files {
            hashes.insert(layout::file_entry(&f.path), f.hash.as_str());
        }
        hashes
    }

    /// Manifest format version is present and supported
    pub fn check_format(&self) -> std::result::Result<(), String> {
        if self.manifest_version == 0 {
            return Err("missing manifest version".to_string());
        }
        if self.manifest_version > MANIFEST_VERSION {
            return Err(format!(
                "manifest version {} is newer than supported version {}",
                self.manifest_version, MANIFEST_VERSION
            ));
        }
        Ok(())
    }

    /// Structural validation; returns the first problem found
    pub fn check(&self) -> std::result::Result<(), String> {
        self.check_format()?;
        if self.id.trim().is_empty() {
            return Err("empty bundle id".to_string());
        }
        if self.version == 0 {
            return Err("version must be at least 1".to_string());
        }

        let mut seen = BTreeSet::new();
        for c in &self.contexts {
            if !seen.insert(c.id.as_str()) {
                return Err(format!("duplicate context {}", c.id));
            }
            if c.file != layout::graph_file_name(&c.id) {
                return Err(format!("unexpected graph file name for context {}", c.id));
            }
        }

        let mut seen = BTreeSet::new();
        for f in &self.files {
            if !path_utils::is_safe_relative(&f.path) {
                return Err(format!("unsafe file path {}", f.path));
            }
            if !seen.insert(f.path.as_str()) {
                return Err(format!("duplicate file {}", f.path));
            }
        }

        for d in &self.dependencies {
            if d.id.trim().is_empty() || d.version == 0 {
                return Err("invalid dependency entry".to_string());
            }
            if d.id == self.id {
                return Err("bundle depends on itself".to_string());
            }
        }

        if !hash::verify_hash(&self.content_hash, &self.compute_content_hash()) {
            return Err("content hash does not match manifest entries".to_string());
        }
        Ok(())
    }

    /// Serialize to the on-disk JSON form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse and validate; `origin` names the source in errors
    pub fn from_bytes(bytes: &[u8], origin: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes)
            .map_err(|e| bundle::malformed(origin, format!("invalid manifest: {e}")))?;
        manifest
            .check()
            .map_err(|reason| bundle::malformed(origin, reason))?;
        Ok(manifest)
    }

    /// Read the manifest of a bundle directory
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(layout::MANIFEST_FILE);
        if !path.is_file() {
            return Err(bundle::malformed(
                dir.display().to_string(),
                "no manifest file",
            ));
        }
        let bytes = std::fs::read(&path).map_err(|e| fs::read_failed(&path, e))?;
        Self::from_bytes(&bytes, &dir.display().to_string())
    }

    /// Write the manifest into a bundle directory
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(layout::MANIFEST_FILE);
        std::fs::write(&path, self.to_bytes()?).map_err(|e| fs::write_failed(&path, e))
    }

    /// Recompute every hash in `dir` and check that it holds exactly the
    /// entries this manifest lists.
    pub fn verify_dir(&self, dir: &Path) -> Result<()> {
        let origin = dir.display().to_string();
        let expected = self.entry_hashes();

        for (entry, expected_hash) in &expected {
            let path = dir.join(entry);
            if !path.is_file() {
                return Err(bundle::corrupt(&origin, format!("missing entry {entry}")));
            }
            let actual = hash::hash_file(&path)?;
            if !hash::verify_hash(expected_hash, &actual) {
                return Err(bundle::corrupt(&origin, format!("hash mismatch for {entry}")));
            }
        }

        for entry in WalkDir::new(dir) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                fs::read_failed(path, e)
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(dir) else {
                continue;
            };
            let relative = path_utils::to_forward_slashes(relative);
            if relative != layout::MANIFEST_FILE && !expected.contains_key(&relative) {
                return Err(bundle::corrupt(
                    &origin,
                    format!("unexpected entry {relative}"),
                ));
            }
        }

        Ok(())
    }
}
