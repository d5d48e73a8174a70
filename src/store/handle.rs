//! Store handles
//!
//! A `Handle` couples exactly one open descriptor with exactly one active
//! memory mapping over a stored image file. Construction is atomic: either
//! it returns a fully usable handle, or everything partially acquired is
//! released before the error propagates; a failed open never leaks a
//! descriptor, lock or mapping. Release happens exactly once, on drop:
//! unmap, then unlock, then close.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};

use super::lock;
use super::{HEADER_SIZE, MAGIC};
use crate::error::{Result, StoreError};
use crate::image::{ImageMut, ImageRef};
use crate::meta::Meta;

enum Mapping {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::ReadOnly(m) => m,
            Mapping::ReadWrite(m) => m,
        }
    }
}

/// Live, locked, memory-mapped view onto one stored image
///
/// The mapping is shared with the OS page cache; the flock held for the
/// handle's lifetime is what makes mutation safe, so only an editable
/// handle (exclusive lock) exposes a mutable view.
pub struct Handle {
    // field order matters: the mapping must be dropped before the file
    map: Mapping,
    file: File,
    path: PathBuf,
    meta: Meta,
}

impl Handle {
    /// Create (or truncate) the file at `path` and map it for writing
    ///
    /// Takes an exclusive non-blocking lock, sizes the file to hold the
    /// header plus payload, writes the magic tag and metadata, and copies
    /// `payload` into the data region when given (the region is otherwise
    /// zero, guaranteed by the truncate + extend sequence).
    ///
    /// Panics if a given payload length does not match `meta.total_bytes()`.
    pub(crate) fn create(path: &Path, meta: &Meta, payload: Option<&[u8]>) -> Result<Handle> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| StoreError::CannotCreateFile {
                path: path.to_path_buf(),
                source: e,
            })?;

        // On any early return below the descriptor closes, which also
        // releases the lock.
        lock::try_exclusive(&file, path)?;

        let map_size = HEADER_SIZE + meta.total_bytes();
        file.set_len(map_size as u64).map_err(StoreError::Seek)?;

        // Safety: the file stays open for the mapping's lifetime and the
        // exclusive flock keeps cooperating writers out.
        let mut map = unsafe { MmapMut::map_mut(&file) }.map_err(StoreError::MapFailed)?;

        map[..MAGIC.len()].copy_from_slice(MAGIC);
        map[MAGIC.len()..HEADER_SIZE].copy_from_slice(&meta.encode());
        if let Some(data) = payload {
            assert_eq!(
                data.len(),
                meta.total_bytes(),
                "payload length does not match image metadata"
            );
            map[HEADER_SIZE..].copy_from_slice(data);
        }

        Ok(Handle {
            map: Mapping::ReadWrite(map),
            file,
            path: path.to_path_buf(),
            meta: *meta,
        })
    }

    /// Open and map an existing file, validating its structure
    ///
    /// Editable handles take an exclusive lock and map read-write;
    /// read-only handles take a shared lock, so concurrent readers may
    /// coexist but no writer is admitted. The magic tag and the size
    /// invariant `file_size == header + total_bytes(meta)` are both
    /// verified; on a mismatch everything acquired so far is released
    /// before `InvalidFile` is returned.
    pub(crate) fn open(path: &Path, editable: bool) -> Result<Handle> {
        let stat = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::FileDoesNotExist(path.to_path_buf())
            } else {
                StoreError::Io(e)
            }
        })?;

        let file_size = stat.len() as usize;
        if file_size < HEADER_SIZE {
            return Err(StoreError::InvalidFile(path.to_path_buf()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(editable)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    StoreError::FileDoesNotExist(path.to_path_buf())
                } else {
                    StoreError::Io(e)
                }
            })?;

        if editable {
            lock::try_exclusive(&file, path)?;
        } else {
            lock::try_shared(&file, path)?;
        }

        // Safety: as in `create`; a shared mapping of a file whose writers
        // honor the same flock discipline.
        let map = if editable {
            Mapping::ReadWrite(unsafe { MmapMut::map_mut(&file) }.map_err(StoreError::MapFailed)?)
        } else {
            Mapping::ReadOnly(unsafe { Mmap::map(&file) }.map_err(StoreError::MapFailed)?)
        };

        let bytes = map.bytes();
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(StoreError::InvalidFile(path.to_path_buf()));
        }

        let meta = Meta::decode(&bytes[MAGIC.len()..HEADER_SIZE])
            .ok_or_else(|| StoreError::InvalidFile(path.to_path_buf()))?;

        if HEADER_SIZE + meta.total_bytes() != file_size {
            return Err(StoreError::InvalidFile(path.to_path_buf()));
        }

        Ok(Handle {
            map,
            file,
            path: path.to_path_buf(),
            meta,
        })
    }

    /// Metadata of the mapped image
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// True when this handle was opened for editing (exclusive lock)
    pub fn editable(&self) -> bool {
        matches!(self.map, Mapping::ReadWrite(_))
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.map.bytes()[HEADER_SIZE..]
    }

    /// Mutable payload bytes, `None` for read-only handles
    pub fn payload_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.map {
            Mapping::ReadOnly(_) => None,
            Mapping::ReadWrite(m) => Some(&mut m[HEADER_SIZE..]),
        }
    }

    /// The mapped image, read-only
    pub fn image(&self) -> ImageRef<'_> {
        ImageRef::new(self.meta, self.payload())
    }

    /// The mapped image, mutable; `None` for read-only handles
    pub fn image_mut(&mut self) -> Option<ImageMut<'_>> {
        let meta = self.meta;
        self.payload_mut().map(|data| ImageMut::new(meta, data))
    }

    /// Release the handle: unmap, unlock, close
    ///
    /// Dropping does the same; this form reads better at call sites that
    /// release early.
    pub fn close(self) {}
}

impl Drop for Handle {
    fn drop(&mut self) {
        // The mapping is never touched after this point; it unmaps when the
        // field drops, then the descriptor closes.
        let _ = lock::unlock(&self.file);
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("path", &self.path)
            .field("meta", &self.meta)
            .field("editable", &self.editable())
            .finish()
    }
}
