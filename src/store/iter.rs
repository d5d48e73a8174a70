//! Store iterators
//!
//! Directory-driven enumeration in OS-native order, with no cross-platform
//! ordering guarantee. Subdirectories and structurally invalid entries are
//! skipped silently. `Keys` never takes a lock; `Iter` opens each
//! surviving entry in editable mode and yields a fresh owned handle per
//! advance, so the previous handle's lock is released whenever the caller
//! drops it.

use std::fs;

use super::handle::Handle;
use super::engine::{is_valid_entry, Store};
use crate::error::Result;

/// Iterator over the keys of structurally valid entries
pub struct Keys {
    entries: fs::ReadDir,
}

impl Keys {
    pub(super) fn new(store: &Store) -> Result<Keys> {
        Ok(Keys {
            entries: fs::read_dir(store.root())?,
        })
    }
}

impl Iterator for Keys {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_valid_entry(&entry.path()) {
                continue;
            }
            return Some(name);
        }
    }
}

/// Iterator over `(key, Handle)` pairs
///
/// Each entry is opened editable; entries that cannot be opened (locked
/// by someone else, or corrupt) are skipped rather than surfaced.
pub struct Iter<'a> {
    store: &'a Store,
    entries: fs::ReadDir,
}

impl<'a> Iter<'a> {
    pub(super) fn new(store: &'a Store) -> Result<Iter<'a>> {
        Ok(Iter {
            store,
            entries: fs::read_dir(store.root())?,
        })
    }
}

impl Iterator for Iter<'_> {
    type Item = (String, Handle);

    fn next(&mut self) -> Option<(String, Handle)> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            match self.store.get(&name, true) {
                Ok(handle) => return Some((name, handle)),
                Err(_) => continue,
            }
        }
    }
}
