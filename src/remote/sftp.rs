//! SFTP accessor
//!
//! Uses the same directory layout as the file accessor, rooted at a path on
//! the server. Authentication tries an identity file, then a password, then
//! the SSH agent.
//!
//! The server's host key is checked before authenticating. A configured
//! `host_key` or `known_hosts` file pins the server: any key that does not
//! match is refused. Without either, `~/.ssh/known_hosts` is consulted when
//! present; a changed key is still refused, an unknown host only warns.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};

use ssh2::{CheckResult, KnownHostFileKind, KnownHosts, Session, Sftp};
use tracing::{debug, warn};

use super::file::{FileAccessor, layout_entries};
use super::{Accessor, Deadline};
use crate::bundle::archive::read_manifest;
use crate::cache::{Listing, ListingEntry};
use crate::domain::BundleKey;
use crate::error::{GraphpackError, Result, remote};
use crate::path_utils;

#[derive(Debug, Clone)]
pub struct SftpAccessor {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Root directory on the server
    pub root: String,
    pub password: Option<String>,
    pub identity: Option<PathBuf>,
    /// Pinned server key, `<type> <base64>`
    pub host_key: Option<String>,
    /// Known-hosts file pinning the server
    pub known_hosts: Option<PathBuf>,
}

/// An authenticated session; the session must outlive the SFTP channel
struct Connection {
    _session: Session,
    sftp: Sftp,
}

impl SftpAccessor {
    fn failed(&self, reason: impl ToString) -> GraphpackError {
        remote::accessor_failed(self.describe(), reason)
    }

    fn connect(&self, deadline: &Deadline) -> Result<Connection> {
        deadline.check(&self.describe())?;
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.failed(e))?
            .next()
            .ok_or_else(|| self.failed(format!("cannot resolve {}", self.host)))?;
        let tcp = TcpStream::connect_timeout(&addr, deadline.remaining()).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                GraphpackError::AccessorTimeout {
                    accessor: self.describe(),
                }
            } else {
                self.failed(e)
            }
        })?;

        let mut session = Session::new().map_err(|e| self.failed(e))?;
        let millis = u32::try_from(deadline.remaining().as_millis()).unwrap_or(u32::MAX);
        session.set_timeout(millis.max(1));
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| self.failed(format!("handshake failed: {e}")))?;
        self.verify_host_key(&session)?;

        if let Some(identity) = &self.identity {
            session
                .userauth_pubkey_file(&self.user, None, identity, None)
                .map_err(|e| self.failed(format!("key authentication failed: {e}")))?;
        } else if let Some(password) = &self.password {
            session
                .userauth_password(&self.user, password)
                .map_err(|e| self.failed(format!("password authentication failed: {e}")))?;
        } else {
            let mut agent = session.agent().map_err(|e| self.failed(e))?;
            agent.connect().map_err(|e| self.failed(e))?;
            agent.list_identities().map_err(|e| self.failed(e))?;
            let identities = agent.identities().map_err(|e| self.failed(e))?;
            let authenticated = identities
                .iter()
                .any(|identity| agent.userauth(&self.user, identity).is_ok());
            if !authenticated {
                return Err(self.failed("no SSH agent identity was accepted"));
            }
        }

        if !session.authenticated() {
            return Err(self.failed("authentication failed"));
        }

        let sftp = session.sftp().map_err(|e| self.failed(e))?;
        Ok(Connection {
            _session: session,
            sftp,
        })
    }

    fn verify_host_key(&self, session: &Session) -> Result<()> {
        let (key, _) = session
            .host_key()
            .ok_or_else(|| self.failed("server presented no host key"))?;
        let mut known = session.known_hosts().map_err(|e| self.failed(e))?;
        let pinned = self.load_known_hosts(&mut known)?;
        self.check_host_key(&known, key, pinned)
    }

    /// Host name as written in known_hosts files
    fn known_hosts_name(&self) -> String {
        if self.port == 22 {
            self.host.clone()
        } else {
            format!("[{}]:{}", self.host, self.port)
        }
    }

    /// Fill `known` with the keys to trust. Returns whether the server is
    /// pinned by configuration.
    fn load_known_hosts(&self, known: &mut KnownHosts) -> Result<bool> {
        let mut pinned = false;
        if let Some(host_key) = &self.host_key {
            let line = format!("{} {}", self.known_hosts_name(), host_key.trim());
            known
                .read_str(&line, KnownHostFileKind::OpenSSH)
                .map_err(|e| self.failed(format!("invalid host key: {e}")))?;
            pinned = true;
        }
        if let Some(path) = &self.known_hosts {
            known
                .read_file(path, KnownHostFileKind::OpenSSH)
                .map_err(|e| self.failed(format!("{}: {e}", path.display())))?;
            pinned = true;
        }
        if !pinned {
            let user_file = dirs::home_dir()
                .map(|home| home.join(".ssh").join("known_hosts"))
                .filter(|path| path.is_file());
            if let Some(path) = user_file {
                if let Err(e) = known.read_file(&path, KnownHostFileKind::OpenSSH) {
                    warn!(path = %path.display(), error = %e, "cannot read known hosts");
                }
            }
        }
        Ok(pinned)
    }

    fn check_host_key(&self, known: &KnownHosts, key: &[u8], pinned: bool) -> Result<()> {
        match known.check_port(&self.host, self.port, key) {
            CheckResult::Match => Ok(()),
            CheckResult::Mismatch => Err(self.failed(format!(
                "host key for {} does not match the known key",
                self.known_hosts_name()
            ))),
            CheckResult::NotFound if pinned => Err(self.failed(format!(
                "host key for {} is not known",
                self.known_hosts_name()
            ))),
            CheckResult::NotFound => {
                warn!(accessor = %self.describe(), "server host key is not in any known hosts file");
                Ok(())
            }
            CheckResult::Failure => Err(self.failed("host key check failed")),
        }
    }

    fn read(&self, sftp: &Sftp, path: &Path) -> Result<Vec<u8>> {
        let mut file = sftp
            .open(path)
            .map_err(|e| self.failed(format!("{}: {e}", path.display())))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| self.failed(e))?;
        Ok(bytes)
    }

    fn mkdir_all(&self, sftp: &Sftp, dir: &Path) -> Result<()> {
        let mut current = PathBuf::new();
        for component in dir.components() {
            current.push(component);
            if sftp.stat(&current).is_ok_and(|s| s.is_dir()) {
                continue;
            }
            sftp.mkdir(&current, 0o755)
                .map_err(|e| self.failed(format!("{}: {e}", current.display())))?;
        }
        Ok(())
    }

    fn subdirs(&self, sftp: &Sftp, dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        Ok(sftp
            .readdir(dir)
            .map_err(|e| self.failed(format!("{}: {e}", dir.display())))?
            .into_iter()
            .filter(|(_, stat)| stat.is_dir())
            .filter_map(|(path, _)| {
                let name = path.file_name()?.to_str()?.to_string();
                Some((name, path))
            })
            .collect())
    }
}

impl Accessor for SftpAccessor {
    fn describe(&self) -> String {
        format!("sftp://{}@{}:{}{}", self.user, self.host, self.port, self.root)
    }

    fn list(&self, deadline: &Deadline) -> Result<Listing> {
        let conn = self.connect(deadline)?;
        let mut entries = Vec::new();

        for (name, id_dir) in self.subdirs(&conn.sftp, Path::new(&self.root))? {
            deadline.check(&self.describe())?;
            let Some(id) = path_utils::unquote_id(&name) else {
                warn!(accessor = %self.describe(), name = %name, "skipping unrecognized directory");
                continue;
            };
            let versions = self.subdirs(&conn.sftp, &id_dir)?;
            entries.extend(layout_entries(&self.describe(), &id, versions, |archive| {
                conn.sftp.stat(archive).is_ok_and(|s| s.is_file())
            }));
        }
        Ok(Listing::new(entries))
    }

    fn fetch(&self, entry: &ListingEntry, deadline: &Deadline) -> Result<Vec<u8>> {
        let conn = self.connect(deadline)?;
        let path = FileAccessor::archive_path(Path::new(&self.root), &entry.id, entry.version);
        let bytes = self.read(&conn.sftp, &path)?;
        deadline.check(&self.describe())?;
        Ok(bytes)
    }

    fn can_upload(&self) -> bool {
        true
    }

    fn upload(&self, archive: &[u8], key: &BundleKey, deadline: &Deadline) -> Result<()> {
        let manifest = read_manifest(archive)?;
        let conn = self.connect(deadline)?;
        let target = FileAccessor::archive_path(Path::new(&self.root), &key.id, key.version);

        if conn.sftp.stat(&target).is_ok_and(|s| s.is_file()) {
            let existing = read_manifest(&self.read(&conn.sftp, &target)?)?;
            if existing.content_hash == manifest.content_hash {
                debug!(key = %key, accessor = %self.describe(), "identical archive already uploaded");
                return Ok(());
            }
            return Err(GraphpackError::VersionAlreadyPublished {
                id: key.id.clone(),
                version: key.version,
            });
        }

        if let Some(parent) = target.parent() {
            self.mkdir_all(&conn.sftp, parent)?;
        }
        let tmp = target.with_extension(format!("tmp-{}", std::process::id()));
        {
            let mut file = conn.sftp.create(&tmp).map_err(|e| self.failed(e))?;
            file.write_all(archive).map_err(|e| self.failed(e))?;
        }
        deadline.check(&self.describe())?;
        conn.sftp
            .rename(&tmp, &target, None)
            .map_err(|e| self.failed(e))?;
        debug!(key = %key, accessor = %self.describe(), "uploaded archive");
        Ok(())
    }
}
