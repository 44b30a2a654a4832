//! Read-only composed view of an installed bundle
//!
//! A bundle's dataset is its own contexts plus the contexts of its
//! transitive dependencies, each dependency edge dropping the contexts it
//! excludes. When several bundles capture the same context, the one
//! closest to the opened bundle owns it (breadth-first, declared order).

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::debug;

use super::layout;
use super::manifest::{Manifest, ManifestDependency};
use crate::cache::{Cache, CacheLookup, InstalledBundle};
use crate::domain::{BundleKey, ContextId, Version};
use crate::error::{Result, bundle, fs};
use crate::resolver::Resolver;
use crate::store::{GraphStore, MemoryStore};
use crate::store::nquads;

#[derive(Debug, Clone)]
pub struct Bundle {
    cache: Cache,
    installed: InstalledBundle,
}

impl Bundle {
    /// Open the given version, or the highest installed one
    pub fn open(cache: &Cache, id: &str, version: Option<Version>) -> Result<Self> {
        let version = match version {
            Some(v) => v,
            None => cache
                .latest(id)?
                .ok_or_else(|| bundle::not_found(id, None))?,
        };
        match cache.lookup(id, version)? {
            CacheLookup::Found(installed) => Ok(Self {
                cache: cache.clone(),
                installed,
            }),
            CacheLookup::NotFound => Err(bundle::not_found(id, Some(version))),
        }
    }

    pub fn key(&self) -> &BundleKey {
        &self.installed.key
    }

    pub fn manifest(&self) -> &Manifest {
        &self.installed.manifest
    }

    pub fn installed(&self) -> &InstalledBundle {
        &self.installed
    }

    /// Contexts captured by this bundle itself
    pub fn contexts(&self) -> Vec<ContextId> {
        self.installed
            .manifest
            .context_ids()
            .map(str::to_string)
            .collect()
    }

    pub fn dependencies(&self) -> &[ManifestDependency] {
        &self.installed.manifest.dependencies
    }

    /// Every context of the composed dataset with the bundle owning it
    pub fn composition(&self) -> Result<Vec<(ContextId, BundleKey)>> {
        let resolution = Resolver::new(&self.cache).resolve(self.key())?;

        let mut owners: Vec<(ContextId, BundleKey)> = Vec::new();
        let mut claimed: HashSet<ContextId> = HashSet::new();
        let mut seen: HashSet<(BundleKey, BTreeSet<ContextId>)> = HashSet::new();
        let mut queue = VecDeque::from([(self.key().clone(), BTreeSet::new())]);

        while let Some((key, excluded)) = queue.pop_front() {
            if !seen.insert((key.clone(), excluded.clone())) {
                continue;
            }
            let Some(manifest) = resolution.manifest(&key) else {
                continue;
            };

            for ctx in manifest.context_ids() {
                if !excluded.contains(ctx) && claimed.insert(ctx.to_string()) {
                    owners.push((ctx.to_string(), key.clone()));
                }
            }

            for dep in &manifest.dependencies {
                let mut dep_excluded = excluded.clone();
                dep_excluded.extend(dep.excludes.iter().cloned());
                queue.push_back((dep.key(), dep_excluded));
            }
        }

        Ok(owners)
    }

    /// Bundle closest to this one that provides `context`
    pub fn owner_of(&self, context: &str) -> Result<Option<BundleKey>> {
        Ok(self
            .composition()?
            .into_iter()
            .find(|(ctx, _)| ctx == context)
            .map(|(_, owner)| owner))
    }

    /// Load the composed dataset into memory
    pub fn load(&self) -> Result<MemoryStore> {
        let mut store = MemoryStore::new();
        for (context, owner) in self.composition()? {
            let owner_bundle = match self.cache.lookup(&owner.id, owner.version)? {
                CacheLookup::Found(b) => b,
                CacheLookup::NotFound => return Err(bundle::not_found(&owner.id, Some(owner.version))),
            };
            let Some(file) = owner_bundle.manifest.context_file(&context) else {
                continue;
            };
            let path = owner_bundle.path.join(layout::GRAPHS_DIR).join(file);
            let text = std::fs::read_to_string(&path).map_err(|e| fs::read_failed(&path, e))?;
            let statements = nquads::parse_ntriples(&text, &path.display().to_string())?;
            store.write_context(&context, &statements)?;
        }
        debug!(key = %self.key(), statements = store.len(), "loaded bundle");
        Ok(store)
    }
}
