//! Error types for the readers.

use thiserror::Error;

/// Errors reading process descriptions or action lists.
#[derive(Debug, Error)]
pub enum ReadError {
    /// File could not be read.
    #[error("could not read {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Process description could not be deserialized.
    #[error("malformed process description: {0}")]
    Description(#[from] serde_json::Error),

    /// Replacement descriptor of an `aggregate` directive could not be
    /// deserialized.
    #[error("malformed replacement descriptor for '{reference}': {source}")]
    Replacement {
        /// Reference expression of the directive.
        reference: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}
