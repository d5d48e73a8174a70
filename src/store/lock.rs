//! Advisory file locking
//!
//! Wraps `fs2`'s flock interface with the store's non-blocking discipline:
//! lock attempts never wait, contention surfaces immediately as
//! [`StoreError::Locked`] and the caller decides when to retry. Locks are
//! advisory; they only constrain processes that take them.

use std::fs::File;
use std::io;
use std::path::Path;

use fs2::FileExt;

use crate::error::{Result, StoreError};

fn map_lock_err(e: io::Error, path: &Path) -> StoreError {
    if e.kind() == io::ErrorKind::WouldBlock {
        StoreError::Locked(path.to_path_buf())
    } else {
        StoreError::Io(e)
    }
}

/// Try to take an exclusive lock without blocking
pub(crate) fn try_exclusive(file: &File, path: &Path) -> Result<()> {
    file.try_lock_exclusive().map_err(|e| map_lock_err(e, path))
}

/// Try to take a shared lock without blocking
pub(crate) fn try_shared(file: &File, path: &Path) -> Result<()> {
    file.try_lock_shared().map_err(|e| map_lock_err(e.into(), path))
}

/// Release a lock held on `file`
///
/// Closing the descriptor also releases the lock; this exists for the paths
/// that unlock before closing and for the recovery sweep.
pub(crate) fn unlock(file: &File) -> io::Result<()> {
    file.unlock()
}
