//! Bundle descriptor (`graphpack.yaml` / any descriptor file)
//!
//! A descriptor declares what a bundle contains:
//!
//! ```yaml
//! id: ex/a
//! version: 2
//! description: Example bundle
//! includes:
//!   - http://example.org/ctx
//!   - http://example.org/placeholder: { empty: true }
//! patterns:
//!   - http://example.org/data/**
//!   - "rgx:urn:x:[0-9]+"
//! excludes:
//!   - http://example.org/data/private
//! files:
//!   includes: [README.md]
//!   patterns: ["data/**/*.csv"]
//! dependencies:
//!   - ex/base
//!   - id: ex/vocab
//!     version: 3
//!     excludes: [http://example.org/vocab/draft]
//! ```
//!
//! Unknown fields are ignored.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ContextId, Version};
use crate::error::{Result, config};

/// File selection of a descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesDescriptor {
    /// Literal project-relative paths; each must exist
    #[serde(default)]
    pub includes: Vec<String>,

    /// Project-relative glob patterns
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Glob patterns removed from pattern matches
    #[serde(default)]
    pub excludes: Vec<String>,
}

/// A declared dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub id: String,
    /// `None` selects the highest available version
    pub version: Option<Version>,
    /// Contexts of the dependency the dependent does not import
    pub excludes: Vec<ContextId>,
}

/// Descriptor of a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub id: String,
    pub version: Version,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Context literals or patterns to include
    pub includes: Vec<String>,
    /// Contexts captured even if the store has no statements for them
    pub empty_contexts: BTreeSet<ContextId>,
    /// Additional context patterns, unioned with `includes`
    pub patterns: Vec<String>,
    pub excludes: Vec<String>,
    pub files: FilesDescriptor,
    /// Declared dependencies, first occurrence wins
    pub dependencies: Vec<DependencyDescriptor>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IncludeEntry {
    Context(String),
    WithOptions(std::collections::BTreeMap<String, IncludeOptions>),
}

#[derive(Deserialize, Default)]
struct IncludeOptions {
    #[serde(default)]
    empty: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DependencyEntry {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        version: Option<Version>,
        #[serde(default)]
        excludes: Vec<String>,
    },
}

#[derive(Deserialize)]
struct DescriptorData {
    id: String,
    #[serde(default = "default_version")]
    version: Version,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    includes: Vec<IncludeEntry>,
    #[serde(default)]
    excludes: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
    #[serde(default)]
    files: Option<FilesDescriptor>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
}

fn default_version() -> Version {
    1
}

impl Descriptor {
    /// Create an empty descriptor
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            name: None,
            description: None,
            includes: Vec::new(),
            empty_contexts: BTreeSet::new(),
            patterns: Vec::new(),
            excludes: Vec::new(),
            files: FilesDescriptor::default(),
            dependencies: Vec::new(),
        }
    }

    /// Parse a descriptor from YAML; `origin` names the source in errors
    pub fn from_yaml(content: &str, origin: &str) -> Result<Self> {
        let data: DescriptorData =
            serde_yaml::from_str(content).map_err(|e| config::parse_failed(origin, e.to_string()))?;

        let mut descriptor = Self::new(data.id, data.version);
        descriptor.name = data.name;
        descriptor.description = data.description;
        descriptor.excludes = data.excludes;
        descriptor.patterns = data.patterns;
        descriptor.files = data.files.unwrap_or_default();

        for entry in data.includes {
            match entry {
                IncludeEntry::Context(ctx) => descriptor.includes.push(ctx),
                IncludeEntry::WithOptions(map) => {
                    for (ctx, options) in map {
                        if options.empty {
                            descriptor.empty_contexts.insert(ctx);
                        } else {
                            descriptor.includes.push(ctx);
                        }
                    }
                }
            }
        }

        for entry in data.dependencies {
            let dependency = match entry {
                DependencyEntry::Id(id) => DependencyDescriptor {
                    id,
                    version: None,
                    excludes: Vec::new(),
                },
                DependencyEntry::Full {
                    id,
                    version,
                    excludes,
                } => DependencyDescriptor {
                    id,
                    version,
                    excludes,
                },
            };
            descriptor.add_dependency(dependency);
        }

        descriptor.validate(origin)?;
        Ok(descriptor)
    }

    /// Load a descriptor file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config::read_failed(path.display().to_string(), e.to_string()))?;
        Self::from_yaml(&content, &path.display().to_string())
    }

    /// Add a dependency unless one with the same id and version is declared
    pub fn add_dependency(&mut self, dependency: DependencyDescriptor) {
        let duplicate = self
            .dependencies
            .iter()
            .any(|d| d.id == dependency.id && d.version == dependency.version);
        if !duplicate {
            self.dependencies.push(dependency);
        }
    }

    /// Check identity fields and dependency declarations
    pub fn validate(&self, origin: &str) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(config::descriptor_invalid(origin, "id must not be empty"));
        }
        if self.version == 0 {
            return Err(config::descriptor_invalid(origin, "version must be at least 1"));
        }
        for dep in &self.dependencies {
            if dep.id.trim().is_empty() {
                return Err(config::descriptor_invalid(
                    origin,
                    "dependency id must not be empty",
                ));
            }
            if dep.version == Some(0) {
                return Err(config::descriptor_invalid(
                    origin,
                    format!("dependency '{}' has version 0", dep.id),
                ));
            }
            if dep.id == self.id {
                return Err(config::descriptor_invalid(
                    origin,
                    "a bundle cannot depend on itself",
                ));
            }
        }
        Ok(())
    }

    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
