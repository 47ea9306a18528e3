//! Request-scoped scratch space.
//!
//! Every upload and every engine output for one request lives under a single
//! temporary directory that is removed when the [`Workspace`] is dropped, so
//! success, validation failures and engine crashes all clean up the same way.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("pdf-tools-").tempdir()?;
        log::debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A fresh, not yet existing file path with the given extension
    /// (including the dot, or empty).
    pub fn file_path(&self, extension: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}{}", Uuid::new_v4().simple(), extension))
    }

    /// Create a named subdirectory for engine output.
    pub fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }
}
