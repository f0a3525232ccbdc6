//! Abstraction over `/proc` file access.
//!
//! The collector reads counter files through this trait so that tests,
//! and development hosts without a Linux `/proc`, can substitute an
//! in-memory implementation.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Read access to proc-style pseudo files.
pub trait ProcFs: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Real implementation delegating to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealProcFs;

impl RealProcFs {
    pub fn new() -> Self {
        Self
    }
}

impl ProcFs for RealProcFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory implementation for tests.
#[derive(Debug, Clone, Default)]
pub struct MockProcFs {
    files: HashMap<PathBuf, String>,
}

impl MockProcFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file with the given content.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(path.as_ref().to_path_buf(), content.into());
    }
}

impl ProcFs for MockProcFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
