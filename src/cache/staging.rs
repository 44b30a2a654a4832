//! Stage-then-commit directories
//!
//! A [`StagingDir`] is created next to the final directory it will become.
//! Content is written into it and only [`StagingDir::commit`] renames it
//! into place. Dropping an uncommitted staging directory removes it, so a
//! failed install never leaves a partial directory under the final name.
//!
//! ```ignore
//! let staging = StagingDir::create(&final_dir)?;
//! write_content(staging.path())?;
//! staging.commit()?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::bundle::layout::STAGING_PREFIX;
use crate::error::{Result, fs as fs_err};

#[derive(Debug)]
pub struct StagingDir {
    /// Directory being populated
    path: PathBuf,

    /// Final location
    target: PathBuf,

    /// Whether the directory has been renamed into place
    committed: bool,
}

impl StagingDir {
    /// Create a fresh staging directory for `target`.
    ///
    /// A leftover staging directory for the same target (from a crashed
    /// writer) is removed first; callers serialize writers per target.
    pub fn create(target: &Path) -> Result<Self> {
        let parent = target
            .parent()
            .ok_or_else(|| fs_err::write_failed(target, "target has no parent directory"))?;
        let name = target
            .file_name()
            .ok_or_else(|| fs_err::write_failed(target, "target has no file name"))?;

        fs::create_dir_all(parent).map_err(|e| fs_err::write_failed(parent, e))?;

        let path = parent.join(format!("{}{}", STAGING_PREFIX, name.to_string_lossy()));
        if path.exists() {
            warn!(path = %path.display(), "removing stale staging directory");
            fs::remove_dir_all(&path).map_err(|e| fs_err::write_failed(&path, e))?;
        }
        fs::create_dir_all(&path).map_err(|e| fs_err::write_failed(&path, e))?;

        Ok(Self {
            path,
            target: target.to_path_buf(),
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically publish the staged directory under its final name
    pub fn commit(mut self) -> Result<()> {
        if self.target.exists() {
            return Err(fs_err::write_failed(&self.target, "target already exists"));
        }
        fs::rename(&self.path, &self.target).map_err(|e| fs_err::write_failed(&self.target, e))?;
        self.committed = true;
        debug!(target = %self.target.display(), "committed staged directory");
        Ok(())
    }

    /// Discard the staged content
    pub fn rollback(&mut self) {
        if self.committed {
            return;
        }
        if self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove staging directory");
            }
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        self.rollback();
    }
}
