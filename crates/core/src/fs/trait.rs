//! FileSystem trait definition

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Metadata about a file
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub file_type: FileType,
}

/// Type of file system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    /// Anything that is neither a regular file nor a directory
    Other,
}

impl FileMetadata {
    pub fn len(&self) -> u64 {
        self.size
    }
}

/// Abstraction over the file system reads the tree builder performs.
pub trait FileSystem: Send + Sync {
    /// Check if path is a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Get file/directory metadata
    fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Read a descriptor as UTF-8 text
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Resolve a path to its absolute form
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;

    /// Locate the descriptor of a module directory relative to its aggregator
    fn module_descriptor(&self, aggregator_dir: &Path, module: &str, file_name: &str) -> PathBuf {
        aggregator_dir.join(module).join(file_name)
    }
}
