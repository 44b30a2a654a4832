//! Common test utilities for graphpack integration tests

use std::path::{Path, PathBuf};
use std::time::Duration;

use graphpack::cache::Cache;
use graphpack::config::{Descriptor, Settings};
use graphpack::installer::{InstallReport, Installer};
use graphpack::remote::file::FileAccessor;
use graphpack::remote::{Accessor, RemoteClient};
use graphpack::store::{MemoryStore, Statement};
use tempfile::TempDir;

/// An isolated cache, remotes directory, project and file remote
#[allow(dead_code)]
pub struct TestEnv {
    pub temp: TempDir,
    pub cache_dir: PathBuf,
    pub remotes_dir: PathBuf,
    pub project: PathBuf,
    /// Root of a directory remote
    pub remote_root: PathBuf,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        let project = root.join("project");
        std::fs::create_dir_all(&project).expect("Failed to create project directory");
        Self {
            cache_dir: root.join("cache"),
            remotes_dir: root.join("remotes"),
            remote_root: root.join("remote"),
            project,
            temp,
        }
    }

    pub fn cache(&self) -> Cache {
        Cache::open(&self.cache_dir).expect("Failed to open cache")
    }

    /// A second cache in the same temp dir, standing in for another machine
    pub fn other_cache(&self, name: &str) -> Cache {
        Cache::open(self.temp.path().join(name)).expect("Failed to open cache")
    }

    pub fn settings(&self) -> Settings {
        Settings::with_dirs(&self.cache_dir, &self.remotes_dir)
    }

    /// Write a file in the project directory
    pub fn write_file(&self, path: &str, content: &str) -> PathBuf {
        let file_path = self.project.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        file_path
    }

    /// Client for the directory remote
    pub fn file_remote(&self, name: &str) -> RemoteClient {
        remote_at(name, &self.remote_root)
    }

    /// Install a bundle from descriptor YAML against `store`
    pub fn install(&self, cache: &Cache, yaml: &str, store: &MemoryStore) -> InstallReport {
        let descriptor = Descriptor::from_yaml(yaml, "test").expect("Invalid descriptor");
        Installer::new(cache)
            .install(&descriptor, store, &self.project)
            .expect("Install failed")
    }

    /// Command for the graphpack binary, isolated from the user's config
    #[allow(deprecated)]
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("graphpack").expect("graphpack binary");
        cmd.env("GRAPHPACK_CACHE_DIR", &self.cache_dir)
            .env("GRAPHPACK_REMOTES_DIR", &self.remotes_dir)
            .env("GRAPHPACK_CONFIG", self.temp.path().join("graphpack.yaml"))
            .env_remove("RUST_LOG")
            .current_dir(&self.project);
        cmd
    }
}

/// Client for a directory remote rooted at `root`
#[allow(dead_code)]
pub fn remote_at(name: &str, root: &Path) -> RemoteClient {
    RemoteClient::with_accessors(
        name,
        vec![Box::new(FileAccessor::new(root)) as Box<dyn Accessor>],
        Duration::from_secs(10),
    )
}

/// A store with one statement per `(context, subject)` pair
#[allow(dead_code)]
pub fn store_with(statements: &[(&str, &str)]) -> MemoryStore {
    let mut store = MemoryStore::new();
    for (context, subject) in statements {
        store.insert(
            context,
            Statement::new(format!("<{subject}>"), "<http://example.org/p>", "\"o\""),
        );
    }
    store
}
