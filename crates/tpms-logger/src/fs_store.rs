//! [`Store`] over the local file system

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tpms_core::storage::{Store, StoreError, StoreResult};

/// Files are resolved relative to `root`; absolute paths are used as-is.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(Path::new(path))
    }
}

fn io_error(path: &str, e: std::io::Error) -> StoreError {
    if e.kind() == ErrorKind::NotFound {
        StoreError::NotFound(path.to_string())
    } else {
        StoreError::Io {
            path: path.to_string(),
            details: e.to_string(),
        }
    }
}

impl Store for FsStore {
    fn read(&mut self, path: &str) -> StoreResult<String> {
        std::fs::read_to_string(self.resolve(path)).map_err(|e| io_error(path, e))
    }

    fn write(&mut self, path: &str, contents: &str) -> StoreResult<()> {
        std::fs::write(self.resolve(path), contents).map_err(|e| io_error(path, e))
    }

    fn create_dir_all(&mut self, path: &str) -> StoreResult<()> {
        std::fs::create_dir_all(self.resolve(path)).map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path());
        assert_eq!(
            store.read("absent.txt"),
            Err(StoreError::NotFound(String::from("absent.txt")))
        );
    }

    #[test]
    fn test_write_needs_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path());

        assert!(matches!(
            store.write("a/b/log.txt", "Time"),
            Err(StoreError::NotFound(_) | StoreError::Io { .. })
        ));

        store.create_dir_all("a/b").unwrap();
        store.write("a/b/log.txt", "Time,x,Temp").unwrap();
        assert_eq!(store.read("a/b/log.txt").unwrap(), "Time,x,Temp");
        assert!(dir.path().join("a/b/log.txt").is_file());
    }
}
