//! Bundle installation from a statement store
//!
//! This module handles:
//! - Resolving the descriptor's context and file selection
//! - Pinning dependencies to installed versions, fetching missing ones
//!   from remotes when any are given
//! - Dropping contexts that dependencies already provide
//! - Serializing graphs, hashing content and committing to the cache
//!
//! Installing is idempotent: the same descriptor over an unchanged store
//! and project produces the same manifest, which the cache recognizes.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::bundle::layout;
use crate::bundle::manifest::Manifest;
use crate::cache::{Cache, InstallOutcome, InstalledBundle, RepositoryIndex};
use crate::config::Descriptor;
use crate::domain::ContextId;
use crate::error::{Result, fs};
use crate::hash;
use crate::operations::Fetcher;
use crate::pattern;
use crate::remote::RemoteClient;
use crate::resolver::{Resolver, VersionConstraint};
use crate::store::GraphStore;
use crate::store::nquads;

/// What an install did
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub bundle: InstalledBundle,
    pub outcome: InstallOutcome,
    /// Selected contexts left out because a dependency provides them
    pub covered: Vec<ContextId>,
}

pub struct Installer<'a> {
    cache: &'a Cache,
    remotes: Option<(&'a [RemoteClient], &'a RepositoryIndex)>,
}

impl<'a> Installer<'a> {
    pub fn new(cache: &'a Cache) -> Self {
        Self {
            cache,
            remotes: None,
        }
    }

    /// Fetch dependencies missing from the cache through `remotes`
    pub fn with_remotes(mut self, remotes: &'a [RemoteClient], index: &'a RepositoryIndex) -> Self {
        self.remotes = Some((remotes, index));
        self
    }

    /// Make every declared dependency available locally
    fn fetch_missing_dependencies(&self, descriptor: &Descriptor) -> Result<()> {
        let Some((remotes, index)) = self.remotes.filter(|(remotes, _)| !remotes.is_empty()) else {
            return Ok(());
        };
        let local = Resolver::new(self.cache);
        for dep in &descriptor.dependencies {
            let constraint = VersionConstraint::from(dep.version);
            if local.select(&dep.id, &constraint)?.is_some() {
                continue;
            }
            debug!(id = %dep.id, version = %constraint, "dependency not in cache, fetching");
            Fetcher::new(self.cache, index, remotes).fetch(&dep.id, dep.version)?;
        }
        Ok(())
    }

    /// Build a bundle from `store` and the files under `project_root`
    pub fn install(
        &self,
        descriptor: &Descriptor,
        store: &dyn GraphStore,
        project_root: &Path,
    ) -> Result<InstallReport> {
        descriptor.validate(&descriptor.id)?;
        self.fetch_missing_dependencies(descriptor)?;

        let resolution = Resolver::new(self.cache).resolve_descriptor(descriptor)?;

        let available = store.contexts()?;
        let selected = pattern::select_contexts(descriptor, &available)?;
        let already = resolution.contexts_already_covered_by(&resolution.direct);
        let (covered, own): (Vec<ContextId>, Vec<ContextId>) =
            selected.into_iter().partition(|ctx| already.contains(ctx));
        if !covered.is_empty() {
            debug!(id = %descriptor.id, contexts = ?covered, "contexts provided by dependencies");
        }

        let files = pattern::resolve_files(project_root, &descriptor.files)?;

        let mut manifest = Manifest::new(descriptor.id.clone(), descriptor.version);
        manifest.name = Some(descriptor.display_name().to_string());
        manifest.description = descriptor.description.clone();

        let mut graphs: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for ctx in &own {
            let statements = store.read_context(ctx)?;
            let data = nquads::write_ntriples(&statements).into_bytes();
            manifest.add_context(ctx.clone(), hash::hash_bytes(&data));
            graphs.insert(layout::graph_file_name(ctx), data);
        }

        for relative in &files {
            let source = project_root.join(relative);
            manifest.add_file(relative.clone(), hash::hash_file(&source)?);
        }

        for dep in &resolution.direct {
            manifest.add_dependency(dep.clone());
        }
        let manifest = manifest.seal();

        let (bundle, outcome) = self.cache.install(&manifest, |dir| {
            let graphs_dir = dir.join(layout::GRAPHS_DIR);
            std::fs::create_dir_all(&graphs_dir).map_err(|e| fs::write_failed(&graphs_dir, e))?;
            for (name, data) in &graphs {
                let path = graphs_dir.join(name);
                std::fs::write(&path, data).map_err(|e| fs::write_failed(&path, e))?;
            }

            for relative in &files {
                let source = project_root.join(relative);
                let target = dir.join(layout::file_entry(relative));
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| fs::write_failed(parent, e))?;
                }
                std::fs::copy(&source, &target).map_err(|e| fs::write_failed(&target, e))?;
            }
            Ok(())
        })?;

        match outcome {
            InstallOutcome::Installed => info!(
                key = %bundle.key,
                contexts = manifest.contexts.len(),
                files = manifest.files.len(),
                "bundle installed"
            ),
            InstallOutcome::AlreadyPresent => {
                info!(key = %bundle.key, "bundle already installed with identical content")
            }
        }

        Ok(InstallReport {
            bundle,
            outcome,
            covered,
        })
    }
}
