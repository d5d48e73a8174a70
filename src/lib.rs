//! # imgstore
//!
//! An embedded, file-system-backed image store:
//! - One file per key: magic tag + fixed metadata record + raw pixel payload
//! - Memory-mapped access, coordinated across processes by advisory locks
//! - Normalized pixel accessor over every supported scalar encoding
//! - Fork-join parallel pixel engine with row-partitioned chunks
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CLI / library caller                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                 │
//! │        (key validation, locking, mapping lifecycle)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!                ┌─────────────┐
//!                │   Handle    │
//!                │ (fd + mmap) │
//!                └──────┬──────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ PixelAccess │          │  each_pixel │
//!   │ (get / set) │          │ (fork-join) │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! Image codecs, RAW demosaicing and color management are external
//! collaborators behind the traits in [`codec`]; the store itself only
//! moves raw typed buffers.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod meta;
pub mod pixel;
pub mod image;
pub mod store;
pub mod codec;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::Config;
pub use meta::{Color, Kind, Meta};
pub use pixel::Pixel;
pub use image::{each_pixel, each_pixel_to, BufferDesc, Image, ImageMut, ImageRef};
pub use store::{Handle, Iter, Keys, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of imgstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
