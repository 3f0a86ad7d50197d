//! Error types for output writing.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while writing output files.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Could not create the directory that should hold the output file.
    #[error("cannot create output directory {}: {source}\n  Suggestion: Check the path and its permissions", path.display())]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Could not write the output file.
    #[error("cannot write {}: {source}\n  Suggestion: Check free disk space and file permissions", path.display())]
    Write {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("cannot serialize report for {}: {source}", path.display())]
    Serialize {
        /// The intended destination.
        path: PathBuf,
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}
