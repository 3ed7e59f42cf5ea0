//! Persistence of the pressure log
//!
//! - [`record`]: the comma-delimited log format
//! - [`gap_filler`]: the post-run interpolation pass over a finished log
//! - [`Store`]: the file-system seam, with an in-memory [`MemoryStore`]

pub mod gap_filler;
pub mod record;

extern crate alloc;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;

use thiserror_no_std::Error;

pub use gap_filler::{FillReport, fill_gaps};
pub use record::{Cell, Record, RecordError, RecordRow, RecordSchema};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {details}")]
    Io { path: String, details: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Text file access used by the session
pub trait Store {
    /// Read a whole file. A missing file is [`StoreError::NotFound`].
    fn read(&mut self, path: &str) -> StoreResult<String>;

    /// Replace a file's contents.
    fn write(&mut self, path: &str, contents: &str) -> StoreResult<()>;

    /// Create `path` and all of its missing parents.
    fn create_dir_all(&mut self, path: &str) -> StoreResult<()>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn read(&mut self, path: &str) -> StoreResult<String> {
        (**self).read(path)
    }

    fn write(&mut self, path: &str, contents: &str) -> StoreResult<()> {
        (**self).write(path, contents)
    }

    fn create_dir_all(&mut self, path: &str) -> StoreResult<()> {
        (**self).create_dir_all(path)
    }
}

/// Folder part of a `/`-separated path, `None` for a bare file name
pub fn parent_folder(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(folder, _)| folder)
        .filter(|folder| !folder.is_empty())
}

/// Create the folder holding `path` if it has one.
pub fn ensure_parent<S: Store + ?Sized>(store: &mut S, path: &str) -> StoreResult<()> {
    match parent_folder(path) {
        Some(folder) => store.create_dir_all(folder),
        None => Ok(()),
    }
}

/// Store backed by a map, for tests and simulations
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    files: BTreeMap<String, String>,
    folders: BTreeSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.folders.contains(path)
    }

    pub fn insert(&mut self, path: &str, contents: &str) {
        self.files.insert(String::from(path), String::from(contents));
    }

    /// Delete a file, leaving its folder in place.
    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }
}

impl Store for MemoryStore {
    fn read(&mut self, path: &str) -> StoreResult<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(String::from(path)))
    }

    fn write(&mut self, path: &str, contents: &str) -> StoreResult<()> {
        if let Some(folder) = parent_folder(path)
            && !self.folders.contains(folder)
        {
            return Err(StoreError::Io {
                path: String::from(path),
                details: String::from("parent folder does not exist"),
            });
        }
        self.insert(path, contents);
        Ok(())
    }

    fn create_dir_all(&mut self, path: &str) -> StoreResult<()> {
        let mut end = 0;
        for segment in path.split('/') {
            end += segment.len();
            if !segment.is_empty() {
                self.folders.insert(String::from(&path[..end]));
            }
            end += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_folder() {
        assert_eq!(parent_folder("runs/a/test.txt"), Some("runs/a"));
        assert_eq!(parent_folder("test.txt"), None);
        assert_eq!(parent_folder("/test.txt"), None);
    }

    #[test]
    fn test_memory_store_requires_parent() {
        let mut store = MemoryStore::new();
        assert!(store.write("runs/test.txt", "Time").is_err());

        ensure_parent(&mut store, "runs/test.txt").unwrap();
        store.write("runs/test.txt", "Time").unwrap();
        assert_eq!(store.read("runs/test.txt").unwrap(), "Time");
    }

    #[test]
    fn test_create_dir_all_registers_every_level() {
        let mut store = MemoryStore::new();
        store.create_dir_all("a/b/c").unwrap();
        assert!(store.has_folder("a"));
        assert!(store.has_folder("a/b"));
        assert!(store.has_folder("a/b/c"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let mut store = MemoryStore::new();
        assert_eq!(
            store.read("nope.txt"),
            Err(StoreError::NotFound(String::from("nope.txt")))
        );
    }
}
