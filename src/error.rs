//! Error types for imgstore
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::meta::Kind;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for imgstore operations
///
/// Lock contention (`Locked`) is never retried internally; callers decide
/// their own retry/backoff policy.
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot create file {}: {}", path.display(), source)]
    CannotCreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("file does not exist: {}", .0.display())]
    FileDoesNotExist(PathBuf),

    #[error("file already exists: {}", .0.display())]
    FileAlreadyExists(PathBuf),

    #[error("seek error while sizing file: {0}")]
    Seek(std::io::Error),

    #[error("unable to map file: {0}")]
    MapFailed(std::io::Error),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("invalid image file: {}", .0.display())]
    InvalidFile(PathBuf),

    #[error("unsupported image type: {kind:?} with {bits} bits")]
    InvalidType { kind: Kind, bits: u8 },

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("file already locked: {}", .0.display())]
    Locked(PathBuf),

    #[error("thread error: {0}")]
    Thread(String),
}
