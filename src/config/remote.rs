//! Remote definitions and their persistence
//!
//! Each remote is stored as `<name>.remote.yaml` in the remotes directory:
//!
//! ```yaml
//! name: origin
//! accessor_configs:
//!   - protocol: http
//!     index_url: https://bundles.example.org/index.json
//!     upload_url: https://bundles.example.org/upload
//!   - protocol: file
//!     path: /mnt/mirror/bundles
//!   - protocol: sftp
//!     host: bundles.example.org
//!     user: deploy
//!     path: /srv/bundles
//!     known_hosts: /etc/ssh/ssh_known_hosts
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, config, fs, remote};

const REMOTE_FILE_SUFFIX: &str = ".remote.yaml";
const DEFAULT_SSH_PORT: u16 = 22;

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// Protocol-specific means of listing, fetching and uploading archives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum AccessorConfig {
    /// A directory laid out as `<quoted id>/<version>/<archive>`
    File { path: PathBuf },

    /// An HTTP(S) index document plus an optional upload endpoint
    Http {
        index_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upload_url: Option<String>,
    },

    /// A directory on an SFTP server with the `file` layout
    Sftp {
        host: String,
        #[serde(default = "default_ssh_port")]
        port: u16,
        user: String,
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        identity: Option<PathBuf>,
        /// Expected server key as `<type> <base64>`, e.g. `ssh-ed25519 AAAA...`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host_key: Option<String>,
        /// OpenSSH known_hosts file to check the server key against
        #[serde(default, skip_serializing_if = "Option::is_none")]
        known_hosts: Option<PathBuf>,
    },
}

impl AccessorConfig {
    /// Build an accessor config from a URL.
    ///
    /// Supports `file://` URLs and plain paths, `http(s)://` index URLs and
    /// `sftp://user@host[:port]/path`.
    pub fn from_url(url: &str) -> Result<Self> {
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::File {
                path: PathBuf::from(path),
            });
        }

        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Self::Http {
                index_url: url.to_string(),
                upload_url: None,
            });
        }

        if let Some(rest) = url.strip_prefix("sftp://") {
            let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
            let (user, host_port) = authority
                .split_once('@')
                .ok_or_else(|| config::invalid(format!("sftp URL needs a user: {url}")))?;
            let (host, port) = match host_port.rsplit_once(':') {
                Some((host, port)) => (
                    host,
                    port.parse::<u16>()
                        .map_err(|_| config::invalid(format!("invalid port in {url}")))?,
                ),
                None => (host_port, DEFAULT_SSH_PORT),
            };
            if user.is_empty() || host.is_empty() {
                return Err(config::invalid(format!("invalid sftp URL: {url}")));
            }
            return Ok(Self::Sftp {
                host: host.to_string(),
                port,
                user: user.to_string(),
                path: format!("/{path}"),
                password: None,
                identity: None,
                host_key: None,
                known_hosts: None,
            });
        }

        if url.contains("://") {
            return Err(config::invalid(format!("unsupported remote URL: {url}")));
        }

        Ok(Self::File {
            path: PathBuf::from(url),
        })
    }

    /// Protocol tag
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Http { .. } => "http",
            Self::Sftp { .. } => "sftp",
        }
    }

    /// Human-readable location, without credentials
    pub fn describe(&self) -> String {
        match self {
            Self::File { path } => format!("file://{}", path.display()),
            Self::Http { index_url, .. } => index_url.clone(),
            Self::Sftp {
                host,
                port,
                user,
                path,
                ..
            } => format!("sftp://{user}@{host}:{port}{path}"),
        }
    }
}

/// A named remote with its accessor configs, tried in declared order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    #[serde(default)]
    pub accessor_configs: Vec<AccessorConfig>,
}

impl Remote {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accessor_configs: Vec::new(),
        }
    }

    /// Append a config. Returns `false` if an equal config is already present.
    pub fn add_config(&mut self, config: AccessorConfig) -> bool {
        if self.accessor_configs.contains(&config) {
            return false;
        }
        self.accessor_configs.push(config);
        true
    }
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(config::invalid(format!(
            "remote name '{name}' may only contain letters, digits, '-', '_' and '.'"
        )))
    }
}

/// Remotes persisted as one YAML file each
#[derive(Debug, Clone)]
pub struct RemoteRegistry {
    dir: PathBuf,
}

impl RemoteRegistry {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}{REMOTE_FILE_SUFFIX}"))
    }

    /// All remotes, sorted by name
    pub fn list(&self) -> Result<Vec<Remote>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut remotes = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(|e| fs::read_failed(&self.dir, e))? {
            let path = entry.map_err(|e| fs::read_failed(&self.dir, e))?.path();
            let is_remote = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(REMOTE_FILE_SUFFIX));
            if is_remote {
                remotes.push(Self::read(&path)?);
            }
        }
        remotes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(remotes)
    }

    fn read(path: &Path) -> Result<Remote> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config::read_failed(path.display().to_string(), e.to_string()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| config::parse_failed(path.display().to_string(), e.to_string()))
    }

    /// Look up a remote by name
    pub fn get(&self, name: &str) -> Result<Remote> {
        validate_name(name)?;
        let path = self.file_for(name);
        if !path.is_file() {
            return Err(remote::unknown(name));
        }
        Self::read(&path)
    }

    /// Write (or overwrite) a remote
    pub fn save(&self, remote: &Remote) -> Result<()> {
        validate_name(&remote.name)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| fs::write_failed(&self.dir, e))?;
        let path = self.file_for(&remote.name);
        let content = serde_yaml::to_string(remote)?;
        std::fs::write(&path, content).map_err(|e| fs::write_failed(&path, e))
    }

    /// Add an accessor config to a remote, creating the remote if needed.
    ///
    /// Returns `false` if the config was already present.
    pub fn add(&self, name: &str, accessor: AccessorConfig) -> Result<bool> {
        let mut remote = match self.get(name) {
            Ok(remote) => remote,
            Err(crate::error::GraphpackError::UnknownRemote { .. }) => Remote::new(name),
            Err(e) => return Err(e),
        };
        let added = remote.add_config(accessor);
        self.save(&remote)?;
        Ok(added)
    }

    /// Delete a remote
    pub fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = self.file_for(name);
        if !path.is_file() {
            return Err(remote::unknown(name));
        }
        std::fs::remove_file(&path).map_err(|e| fs::write_failed(&path, e))
    }
}
