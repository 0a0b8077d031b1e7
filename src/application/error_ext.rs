//! Error conversion helpers for knowledge base I/O
//!
//! Provides extension traits for cleaner error handling with path context.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Failure to read the knowledge base.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&path).or_file_open(&path)?;
    /// ```
    fn or_file_open(self, path: &Path) -> ApplicationResult<T>;

    /// Failure to write the knowledge base.
    fn or_file_create(self, path: &Path) -> ApplicationResult<T>;

    /// Failure talking to the user.
    fn or_console(self) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn or_file_open(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::FileOpen {
            path: path.to_path_buf(),
            source,
        })
    }

    fn or_file_create(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::FileCreate {
            path: path.to_path_buf(),
            source,
        })
    }

    fn or_console(self) -> ApplicationResult<T> {
        self.map_err(ApplicationError::Console)
    }
}
