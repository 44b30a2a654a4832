//! Per-key exclusive locks
//!
//! Writers of a bundle directory hold an OS file lock on
//! `locks/<quoted id>@<version>.lock`. The lock is advisory and works
//! across threads and processes; it is released when the guard drops.
//! Evicting a key removes its lock file, so an acquirer that wins the lock
//! on an unlinked file retries on a fresh one.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::FileExt;
use tracing::debug;

use crate::error::{Result, fs};

#[derive(Debug)]
pub struct KeyLock {
    file: File,
    path: PathBuf,
}

impl KeyLock {
    /// Block until the lock at `path` is held exclusively
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| fs::write_failed(parent, e))?;
        }
        loop {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(path)
                .map_err(|e| fs::write_failed(path, e))?;
            FileExt::lock_exclusive(&file)
                .map_err(|e| fs::cache_failed(format!("failed to lock {}: {e}", path.display())))?;
            if is_linked_at(&file, path) {
                debug!(path = %path.display(), "acquired key lock");
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                });
            }
            debug!(path = %path.display(), "lock file removed while waiting, retrying");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the lock file, then release the lock
    pub fn remove(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "failed to remove lock file");
        }
    }
}

#[cfg(unix)]
fn is_linked_at(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(current)) => held.dev() == current.dev() && held.ino() == current.ino(),
        _ => false,
    }
}

// Open files cannot be deleted here, so the path always names the held file
#[cfg(not(unix))]
fn is_linked_at(_file: &File, _path: &Path) -> bool {
    true
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_lock_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("locks/a.lock");
        let lock = KeyLock::acquire(&path).unwrap();
        assert!(lock.path().is_file());
    }

    #[test]
    fn test_remove_deletes_lock_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("locks/a.lock");
        KeyLock::acquire(&path).unwrap().remove();
        assert!(!path.exists());

        // The key can be locked again afterwards
        let again = KeyLock::acquire(&path).unwrap();
        assert!(again.path().is_file());
    }

    #[test]
    fn test_lock_is_exclusive_across_threads() {
        let temp = TempDir::new().unwrap();
        let path = Arc::new(temp.path().join("locks/k.lock"));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = Arc::clone(&path);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let _lock = KeyLock::acquire(&path).unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
