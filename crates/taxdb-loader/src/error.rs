//! Error types for the taxonomy loader
//!
//! Errors are grouped by how the pipeline treats them:
//!
//! - [`LoaderError::Config`] is fatal before anything touches the network,
//!   the filesystem or the database.
//! - [`FetchError`] is recovered by the pipeline: the run is marked failed.
//! - [`ArchiveError`] and database errors from the schema rebuild propagate
//!   and abort the run.
//! - [`LoaderError::Load`] rolls back the bulk-load transaction.

use std::path::PathBuf;

use taxdb_common::DumpError;
use thiserror::Error;

/// Result type alias for loader operations
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Main error type for the loader
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] FetchError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Loading table '{table}' failed: {source}")]
    Load {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Malformed dump file '{file}': {source}")]
    Dump {
        file: String,
        #[source]
        source: DumpError,
    },

    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),
}

impl LoaderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Table the error occurred in, when it happened during bulk load
    pub fn table(&self) -> Option<&'static str> {
        match self {
            LoaderError::Load { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// Failure to retrieve the remote archive
///
/// Transport problems (the bytes never arrived) are kept apart from protocol
/// problems (the server answered, but not with the archive) so a caller can
/// choose a retry policy per kind.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("server refused {url}: {reason}")]
    Protocol { url: String, reason: String },

    #[error("invalid source URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    pub fn transport(url: impl ToString, reason: impl ToString) -> Self {
        Self::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(url: impl ToString, reason: impl ToString) -> Self {
        Self::Protocol {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether repeating the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}

/// Failure to expand the downloaded archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("archive {} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("archive entry '{name}' escapes the working directory")]
    UnsafeEntry { name: String },

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_transient() {
        let err = FetchError::transport("ftp://example.org/taxdmp.zip", "connection refused");
        assert!(err.is_transient());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_protocol_errors_are_not_transient() {
        let err = FetchError::protocol("https://example.org/taxdmp.zip", "HTTP 404 Not Found");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_load_error_names_table() {
        let err = LoaderError::Load {
            table: "names",
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(err.table(), Some("names"));
        assert!(err.to_string().contains("'names'"));
        assert_eq!(LoaderError::config("x").table(), None);
    }
}
