//! Defines application-specific error types.
//!
//! This module provides the `Error` enum, which categorizes the failure modes
//! of a conversion run, offering more context than generic I/O or `anyhow`
//! errors. Only the pre-run variants (`RootMissing`, `RootNotWritable`) ever
//! abort a run; everything else is either fatal glue (`Interrupted`) or
//! collected per item by the pipeline.

use std::path::Path;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-specific errors used throughout `vaultport`.
#[derive(Error, Debug)]
pub enum Error {
    /// Error occurring during file or directory access (read, write, rename).
    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        /// The path that caused the I/O error.
        path: String, // String avoids lifetime issues once the PathBuf is gone
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// The export root to convert does not exist or is not a directory.
    #[error("Export root '{0}' does not exist or is not a directory")]
    RootMissing(String),

    /// The export root exists but cannot be written to.
    #[error("Export root '{0}' is not writable")]
    RootNotWritable(String),

    /// The operation was cancelled, either by Ctrl+C or by declining the
    /// confirmation prompt. No mutation has occurred when this is returned
    /// from the confirm gate.
    #[error("Operation cancelled before any filesystem mutation")]
    Interrupted,

    /// Discovery found no documents under the export root.
    #[error("No documents found under the export root")]
    NoDocumentsFound,
}

/// Helper to create an [`Error::Io`] with path context.
pub fn io_error_with_path<P: AsRef<Path>>(source: std::io::Error, path: P) -> Error {
    Error::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io, path::PathBuf};

    #[test]
    fn test_io_error_with_path_helper() {
        let path = PathBuf::from("some/export/page.md");
        let source_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let app_error = io_error_with_path(source_error, &path);

        match app_error {
            Error::Io {
                path: error_path,
                source,
            } => {
                assert!(error_path.contains("some/export/page.md"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected Error::Io"),
        }
    }

    #[test]
    fn test_error_display_distinguishes_pre_run_failures() {
        let missing = Error::RootMissing("/nope".to_string());
        assert!(missing.to_string().contains("/nope"));

        let unwritable = Error::RootNotWritable("/ro".to_string());
        assert!(unwritable.to_string().contains("not writable"));
    }
}
