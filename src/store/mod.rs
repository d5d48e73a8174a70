//! Storage engine
//!
//! Maps string keys to memory-mapped image files under one root directory,
//! with advisory file locks coordinating access across processes.
//!
//! ## Responsibilities
//! - Key validation and root-relative path construction
//! - The on-disk file format and its structural-validity invariant
//! - Open/Set/Get/Remove/Stat/Destroy plus the locking discipline
//! - Handle lifecycle (descriptor + mapping pairing) and iteration
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header (32 bytes)                       │
//! │ ┌───────────┬───────────────────────┐   │
//! │ │ Magic (4) │ Meta record (28)      │   │
//! │ │  "imgd"   │ w, h, color, kind,    │   │
//! │ │           │ bits (little-endian)  │   │
//! │ └───────────┴───────────────────────┘   │
//! ├─────────────────────────────────────────┤
//! │ Payload                                 │
//! │ width * height * channels * (bits / 8)  │
//! │ bytes of raw interleaved scalars        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Structural validity: `file_size == 32 + total_bytes(meta)`, exactly.
//!
//! ## Locking
//! Writers (`set`, editable `get`, `remove`) take an exclusive
//! non-blocking flock; read-only `get` takes a shared one. Attempts never
//! block: contention returns [`crate::StoreError::Locked`] immediately
//! and retry policy belongs to the caller.

mod engine;
mod handle;
mod iter;
mod lock;

pub use engine::Store;
pub use handle::Handle;
pub use iter::{Iter, Keys};

use crate::meta::META_SIZE;

/// Magic tag opening every stored file
pub const MAGIC: &[u8; 4] = b"imgd";

/// Bytes preceding the payload: magic tag plus encoded metadata
pub const HEADER_SIZE: usize = MAGIC.len() + META_SIZE;
