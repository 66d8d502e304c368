// src/error.rs

//! Unified error handling for the collector.
//!
//! Fetching and committing each have their own taxonomy ([`FetchError`],
//! [`StoreError`]) so the scheduler can decide per failure kind; everything
//! else funnels into [`AppError`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for collector operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure while retrieving a source.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Descriptor lacks `scheme://` or names a scheme we don't speak
    #[error("unsupported source {source_desc:?}: {reason}")]
    UnsupportedSource { source_desc: String, reason: String },

    /// A request option rejected its input; no request was sent
    #[error("request configuration failed: {0}")]
    RequestConfiguration(String),

    /// The redirect chain reached the configured cap
    #[error("refusing redirect to {destination} after {hops} earlier request(s)")]
    TooManyRedirects { destination: String, hops: usize },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local source does not exist
    #[error("source file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Local source is not readable
    #[error("permission denied reading {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Any other local read failure
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Shutdown was requested while the fetch was in flight
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Create an unsupported-source error.
    pub fn unsupported(source_desc: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::UnsupportedSource {
            source_desc: source_desc.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a request configuration error.
    pub fn request_config(message: impl fmt::Display) -> Self {
        Self::RequestConfiguration(message.to_string())
    }
}

/// Which handle a failed `fsync` was issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    TempFile,
    Directory,
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTarget::TempFile => f.write_str("temporary file"),
            SyncTarget::Directory => f.write_str("storage directory"),
        }
    }
}

/// Failure while committing a payload to the storage directory.
///
/// Every variant past temp file creation carries the number of bytes that
/// reached the temporary file, so a caller can tell "nothing written" from
/// "written and synced but not moved into place".
#[derive(Error, Debug)]
pub enum StoreError {
    /// Destination name would not land inside the storage directory
    #[error("invalid artifact name {0:?}")]
    InvalidName(String),

    #[error("cannot open storage directory {}: {source}", dir.display())]
    DirectoryOpen {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create temporary file in {}: {source}", dir.display())]
    TempFileCreate {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write to {} failed after {written} byte(s): {source}", temp_file.display())]
    Write {
        temp_file: PathBuf,
        written: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("syncing {target} failed after {written} byte(s): {source}")]
    Sync {
        target: SyncTarget,
        written: usize,
        #[source]
        source: std::io::Error,
    },

    /// Destination already present; the synced temp file is left behind
    #[error(
        "destination {} already exists, leaving temporary file {}",
        destination.display(),
        temp_file.display()
    )]
    DestinationExists {
        destination: PathBuf,
        temp_file: PathBuf,
        written: usize,
    },

    #[error("renaming {} to {} failed: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        written: usize,
        #[source]
        source: std::io::Error,
    },

    /// The blocking commit task panicked or was aborted
    #[error("commit task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Bytes durably written to the temporary file before the failure.
    pub fn bytes_written(&self) -> usize {
        match self {
            StoreError::InvalidName(_)
            | StoreError::DirectoryOpen { .. }
            | StoreError::TempFileCreate { .. }
            | StoreError::TaskFailed(_) => 0,
            StoreError::Write { written, .. }
            | StoreError::Sync { written, .. }
            | StoreError::DestinationExists { written, .. }
            | StoreError::Rename { written, .. } => *written,
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Retrieval failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Commit failed
    #[error("store failed: {0}")]
    Store(#[from] StoreError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration value out of range
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage directory could not be created or verified
    #[error("Startup error: {0}")]
    Startup(String),

    /// Correlation ID could not be generated
    #[error("Correlation error: {0}")]
    Correlation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a startup error with context.
    pub fn startup(context: impl fmt::Display, err: impl fmt::Display) -> Self {
        Self::Startup(format!("{context}: {err}"))
    }

    /// Create a correlation error.
    pub fn correlation(message: impl fmt::Display) -> Self {
        Self::Correlation(message.to_string())
    }
}
