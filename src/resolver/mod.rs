//! Dependency resolution for bundles
//!
//! This module handles:
//! - Selecting concrete versions for declared dependencies
//! - Building the dependency graph by walking manifests
//! - Cycle detection and leaves-first ordering ([`sort`])
//! - Answering which contexts a set of dependencies already provides
//!
//! Manifests come from a [`ManifestSource`]: the local cache when
//! installing, or the cache plus remote archives when fetching. Only
//! manifests are read, never bundle content.

pub mod graph;
pub mod sort;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::debug;

use crate::bundle::manifest::{Manifest, ManifestDependency};
use crate::config::Descriptor;
use crate::domain::{BundleKey, ContextId, Version};
use crate::error::{GraphpackError, Result, bundle};
use graph::{DependencyGraph, NodeId};

/// Where the resolver reads bundle manifests from
pub trait ManifestSource {
    /// Known versions of `id`, highest first
    fn versions(&self, id: &str) -> Result<Vec<Version>>;

    /// Manifest of one bundle release, if known
    fn manifest(&self, id: &str, version: Version) -> Result<Option<Manifest>>;
}

/// Requested version of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionConstraint {
    Exact(Version),
    /// Highest available version
    Latest,
}

impl From<Option<Version>> for VersionConstraint {
    fn from(version: Option<Version>) -> Self {
        version.map_or(Self::Latest, Self::Exact)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{v}"),
            Self::Latest => f.write_str("latest"),
        }
    }
}

/// Decides whether a version satisfies a constraint.
///
/// The resolver picks the highest satisfying version, so range-style
/// policies only need to answer this predicate.
pub trait Satisfies {
    fn satisfies(&self, constraint: &VersionConstraint, version: Version) -> bool;
}

/// Exact version equality; `Latest` accepts any version
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatch;

impl Satisfies for ExactMatch {
    fn satisfies(&self, constraint: &VersionConstraint, version: Version) -> bool {
        match constraint {
            VersionConstraint::Exact(v) => *v == version,
            VersionConstraint::Latest => true,
        }
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The bundle being resolved
    pub root: BundleKey,
    /// Bundles to ensure present, dependencies before dependents. Contains
    /// the root only when it is an existing release.
    pub order: Vec<BundleKey>,
    /// The root's dependencies pinned to concrete versions
    pub direct: Vec<ManifestDependency>,
    manifests: HashMap<BundleKey, Manifest>,
    links: HashMap<BundleKey, Vec<ManifestDependency>>,
}

impl Resolution {
    pub fn manifest(&self, key: &BundleKey) -> Option<&Manifest> {
        self.manifests.get(key)
    }

    /// Contexts visible through a resolved bundle: its own contexts plus
    /// those of its dependencies, minus each edge's excludes.
    pub fn contexts_available_through(&self, key: &BundleKey) -> BTreeSet<ContextId> {
        let mut contexts: BTreeSet<ContextId> = self
            .manifests
            .get(key)
            .map(|m| m.context_ids().map(str::to_string).collect())
            .unwrap_or_default();
        if let Some(deps) = self.links.get(key) {
            contexts.extend(self.contexts_already_covered_by(deps));
        }
        contexts
    }

    /// Contexts a dependent importing `dependencies` already receives
    pub fn contexts_already_covered_by(
        &self,
        dependencies: &[ManifestDependency],
    ) -> BTreeSet<ContextId> {
        let mut covered = BTreeSet::new();
        for dep in dependencies {
            covered.extend(
                self.contexts_available_through(&dep.key())
                    .into_iter()
                    .filter(|ctx| !dep.excludes.contains(ctx)),
            );
        }
        covered
    }
}

struct Walk {
    graph: DependencyGraph,
    manifests: HashMap<BundleKey, Manifest>,
    links: HashMap<BundleKey, Vec<ManifestDependency>>,
}

pub struct Resolver<'a> {
    source: &'a dyn ManifestSource,
    policy: Box<dyn Satisfies + 'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn ManifestSource) -> Self {
        Self::with_policy(source, ExactMatch)
    }

    pub fn with_policy(source: &'a dyn ManifestSource, policy: impl Satisfies + 'a) -> Self {
        Self {
            source,
            policy: Box::new(policy),
        }
    }

    /// Highest known version of `id` satisfying `constraint`
    pub fn select(&self, id: &str, constraint: &VersionConstraint) -> Result<Option<Version>> {
        let mut versions = self.source.versions(id)?;
        versions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(versions
            .into_iter()
            .find(|&v| self.policy.satisfies(constraint, v)))
    }

    /// Resolve an existing release and everything it depends on
    pub fn resolve(&self, root: &BundleKey) -> Result<Resolution> {
        let manifest = self
            .source
            .manifest(&root.id, root.version)?
            .ok_or_else(|| bundle::not_found(&root.id, Some(root.version)))?;

        let mut walk = Walk::new();
        let root_node = walk.graph.add_node(root.clone());
        let direct = manifest.dependencies.clone();
        walk.manifests.insert(root.clone(), manifest);

        let direct = self.walk(&mut walk, root_node, direct)?;
        self.finish(walk, root.clone(), root_node, direct, true)
    }

    /// Resolve the dependencies of a descriptor that is about to be
    /// installed. The descriptor itself is a synthetic root.
    pub fn resolve_descriptor(&self, descriptor: &Descriptor) -> Result<Resolution> {
        let root = BundleKey::new(descriptor.id.clone(), descriptor.version);

        let mut pinned = Vec::new();
        for dep in &descriptor.dependencies {
            let constraint = VersionConstraint::from(dep.version);
            let version = self
                .select(&dep.id, &constraint)?
                .ok_or_else(|| unresolved(&root, &dep.id, constraint))?;
            pinned.push(ManifestDependency {
                id: dep.id.clone(),
                version,
                excludes: dep.excludes.clone(),
            });
        }

        let mut walk = Walk::new();
        let root_node = walk.graph.add_node(root.clone());
        let direct = self.walk(&mut walk, root_node, pinned)?;
        self.finish(walk, root, root_node, direct, false)
    }

    /// Add every bundle reachable from `from` to the graph. Returns the
    /// root's links with versions as selected.
    fn walk(
        &self,
        walk: &mut Walk,
        from: NodeId,
        dependencies: Vec<ManifestDependency>,
    ) -> Result<Vec<ManifestDependency>> {
        let mut pending = vec![(from, dependencies)];

        while let Some((node, deps)) = pending.pop() {
            let dependent = walk.graph.key(node).clone();
            let mut links = Vec::with_capacity(deps.len());

            for dep in deps {
                let constraint = VersionConstraint::Exact(dep.version);
                let already_walked = walk
                    .graph
                    .node_id(&BundleKey::new(dep.id.clone(), dep.version))
                    .is_some();
                let version = if already_walked {
                    dep.version
                } else {
                    self.select(&dep.id, &constraint)?
                        .ok_or_else(|| unresolved(&dependent, &dep.id, constraint))?
                };
                let key = BundleKey::new(dep.id.clone(), version);

                let known = walk.graph.node_id(&key).is_some();
                let to = walk.graph.add_node(key.clone());
                walk.graph.add_edge(node, to);

                if !known {
                    let manifest = self
                        .source
                        .manifest(&key.id, key.version)?
                        .ok_or_else(|| unresolved(&dependent, &dep.id, constraint))?;
                    pending.push((to, manifest.dependencies.clone()));
                    walk.manifests.insert(key.clone(), manifest);
                }

                links.push(ManifestDependency {
                    id: key.id,
                    version,
                    excludes: dep.excludes,
                });
            }

            walk.links.insert(dependent, links);
        }

        Ok(walk
            .links
            .get(walk.graph.key(from))
            .cloned()
            .unwrap_or_default())
    }

    fn finish(
        &self,
        walk: Walk,
        root: BundleKey,
        root_node: NodeId,
        direct: Vec<ManifestDependency>,
        include_root: bool,
    ) -> Result<Resolution> {
        let order: Vec<BundleKey> = sort::topological_sort(&walk.graph, &[root_node])?
            .into_iter()
            .filter(|&n| include_root || n != root_node)
            .map(|n| walk.graph.key(n).clone())
            .collect();

        debug!(
            root = %root,
            order = ?order.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "resolved dependencies"
        );

        Ok(Resolution {
            root,
            order,
            direct,
            manifests: walk.manifests,
            links: walk.links,
        })
    }
}

impl Walk {
    fn new() -> Self {
        Self {
            graph: DependencyGraph::new(),
            manifests: HashMap::new(),
            links: HashMap::new(),
        }
    }
}

fn unresolved(dependent: &BundleKey, id: &str, constraint: VersionConstraint) -> GraphpackError {
    GraphpackError::UnresolvedDependency {
        dependent: dependent.to_string(),
        id: id.to_string(),
        version: constraint.to_string(),
    }
}
