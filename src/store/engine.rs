//! Store engine
//!
//! The store owns a root directory and nothing else; every operation is a
//! self-contained sequence of filesystem calls, so one `Store` value can be
//! shared freely. Per-key mutual exclusion comes from the advisory lock
//! each operation takes on the key's file, never from in-process state.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::handle::Handle;
use super::iter::{Iter, Keys};
use super::{lock, HEADER_SIZE, MAGIC};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::image::Image;
use crate::meta::Meta;

/// Returns true when `key` is a usable single path segment
///
/// Keys containing the path separator are rejected before any filesystem
/// access, which also prevents traversal outside the root; empty and
/// dot-relative names are rejected for the same reason.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(std::path::MAIN_SEPARATOR)
        && !key.contains('/')
}

/// Embedded image store rooted at one directory
pub struct Store {
    config: Config,
}

impl Store {
    /// Open a store, creating the root directory tree if missing
    ///
    /// Fails only when the directory cannot be created.
    pub fn open(config: Config) -> Result<Store> {
        fs::create_dir_all(&config.data_dir)?;
        debug!(root = %config.data_dir.display(), "opened store");
        Ok(Store { config })
    }

    /// Open with a root path and default options (convenience)
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Store> {
        Store::open(Config::builder().data_dir(path.as_ref()).build())
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.config.data_dir
    }

    /// The configuration this store was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the path for `key`, rejecting invalid keys before any I/O
    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.config.data_dir.join(key))
    }

    /// Returns true when a value is stored under `key`
    ///
    /// False for invalid keys; otherwise plain filesystem existence.
    pub fn has_key(&self, key: &str) -> bool {
        match self.key_path(key) {
            Ok(path) => path.exists(),
            Err(_) => false,
        }
    }

    /// Store an image under `key`, returning an open editable handle
    ///
    /// The file is created or truncated, locked exclusively (contention →
    /// `Locked`), sized to hold header plus payload and mapped read-write.
    /// When `data` is `None` the payload is left zeroed. Callers that do
    /// not need the handle simply drop it, which unlocks and closes.
    ///
    /// Panics if a given payload length does not match `meta.total_bytes()`.
    pub fn set(&self, key: &str, meta: &Meta, data: Option<&[u8]>) -> Result<Handle> {
        let path = self.key_path(key)?;
        let handle = Handle::create(&path, meta, data)?;
        debug!(key, width = meta.width, height = meta.height, "set");
        Ok(handle)
    }

    /// Store a heap image under `key` (convenience over [`Store::set`])
    pub fn set_image(&self, key: &str, image: &Image) -> Result<Handle> {
        self.set(key, image.meta(), Some(image.data()))
    }

    /// Open the image stored under `key`
    ///
    /// `editable` selects a read-write mapping under an exclusive lock;
    /// otherwise the mapping is read-only under a shared lock, so any
    /// number of readers may hold handles concurrently. Structurally
    /// invalid files fail with `InvalidFile`; when the store was opened
    /// with `remove_corrupt`, such an entry is also deleted. That
    /// self-healing is destructive, so it is disabled by default.
    pub fn get(&self, key: &str, editable: bool) -> Result<Handle> {
        let path = self.key_path(key)?;
        match Handle::open(&path, editable) {
            Ok(handle) => {
                debug!(key, editable, "get");
                Ok(handle)
            }
            Err(StoreError::InvalidFile(p)) if self.config.remove_corrupt => {
                warn!(key, "removing corrupt entry");
                let _ = fs::remove_file(&p);
                Err(StoreError::InvalidFile(p))
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the value stored under `key`
    ///
    /// Verifies the magic tag first (a non-store file is never deleted) and
    /// takes the exclusive lock, so a key cannot be removed out from under
    /// an open handle; contention surfaces as `Locked`.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;

        let mut file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::FileDoesNotExist(path));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let mut magic = [0u8; 4];
        if file.read_exact(&mut magic).is_err() || magic != *MAGIC {
            return Err(StoreError::InvalidFile(path));
        }

        lock::try_exclusive(&file, &path)?;
        fs::remove_file(&path)?;
        debug!(key, "removed");
        Ok(())
    }

    /// OS file metadata for `key`
    pub fn stat(&self, key: &str) -> Result<fs::Metadata> {
        let path = self.key_path(key)?;
        Ok(fs::metadata(path)?)
    }

    /// Structural probe: magic tag plus exact size invariant
    ///
    /// Taken without any lock, so this is advisory only; the file may
    /// change between the probe and a later operation.
    pub fn is_valid_file(&self, key: &str) -> bool {
        let Ok(path) = self.key_path(key) else {
            return false;
        };
        is_valid_entry(&path)
    }

    /// Returns true when the entry under `key` is currently locked
    ///
    /// Probes by attempting an exclusive non-blocking acquire, which is
    /// released immediately when it succeeds.
    pub fn key_is_locked(&self, key: &str) -> bool {
        let Ok(path) = self.key_path(key) else {
            return false;
        };
        let Ok(file) = fs::File::open(&path) else {
            return false;
        };
        match lock::try_exclusive(&file, &path) {
            Ok(()) => {
                let _ = lock::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }

    /// Recovery sweep: force-release the lock on every entry in the root
    ///
    /// Clears locks left behind by an abnormal shutdown of this process.
    /// It cannot (and does not) break locks held by other still-running
    /// processes.
    pub fn reset_locks(&self) -> Result<()> {
        for entry in fs::read_dir(self.root())? {
            let Ok(entry) = entry else { continue };
            if let Ok(file) = fs::File::open(entry.path()) {
                let _ = lock::unlock(&file);
            }
        }
        debug!(root = %self.root().display(), "reset locks");
        Ok(())
    }

    /// Iterate over the keys of structurally valid entries
    ///
    /// Directory order, no ordering guarantee; no locks are taken.
    pub fn keys(&self) -> Result<Keys> {
        Keys::new(self)
    }

    /// Iterate over `(key, Handle)` pairs, opening each entry editable
    ///
    /// Entries that fail to open (locked elsewhere or structurally
    /// invalid) are skipped silently.
    pub fn iter(&self) -> Result<Iter<'_>> {
        Iter::new(self)
    }

    /// Delete every entry, then the root directory itself
    ///
    /// Corrupt entries are unlinked directly; a locked entry aborts the
    /// destroy with `Locked` so a live handle is never pulled out from
    /// under its owner.
    pub fn destroy(self) -> Result<()> {
        let root = self.root().to_path_buf();

        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            let Some(key) = entry.file_name().to_str().map(str::to_string) else {
                // not a key we could have written; clear it so the rmdir works
                fs::remove_file(&path)?;
                continue;
            };
            match self.remove(&key) {
                Ok(()) => {}
                Err(StoreError::InvalidFile(_)) => {
                    warn!(key, "destroy: unlinking corrupt entry");
                    fs::remove_file(&path)?;
                }
                Err(e) => return Err(e),
            }
        }

        fs::remove_dir(&root)?;
        debug!(root = %root.display(), "destroyed store");
        Ok(())
    }
}

/// Shared structural check used by the probe and the key iterator
pub(super) fn is_valid_entry(path: &Path) -> bool {
    let Ok(stat) = fs::metadata(path) else {
        return false;
    };
    if !stat.is_file() {
        return false;
    }

    let Ok(mut file) = fs::File::open(path) else {
        return false;
    };
    let mut header = [0u8; HEADER_SIZE];
    if file.read_exact(&mut header).is_err() {
        return false;
    }
    if header[..MAGIC.len()] != *MAGIC {
        return false;
    }
    let Some(meta) = Meta::decode(&header[MAGIC.len()..]) else {
        return false;
    };

    HEADER_SIZE + meta.total_bytes() == stat.len() as usize
}
