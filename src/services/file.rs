// src/services/file.rs

//! Local `file://` retrieval.

use std::io::ErrorKind;

use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::models::{FetchAttempt, SourceDescriptor};

/// Read the whole file named by a `file://` descriptor.
pub async fn read_source(
    attempt: &FetchAttempt,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, FetchError> {
    let path = local_path(&attempt.source)?;
    log::debug!("[{}] Reading {}", attempt.id, path.display());

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        result = tokio::fs::read(&path) => result,
    };

    result.map_err(|e| {
        log::error!("[{}] Reading {} failed: {}", attempt.id, path.display(), e);
        match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound(path.clone()),
            ErrorKind::PermissionDenied => FetchError::PermissionDenied(path.clone()),
            _ => FetchError::Io {
                path: path.clone(),
                source: e,
            },
        }
    })
}

fn local_path(source: &SourceDescriptor) -> Result<std::path::PathBuf, FetchError> {
    source
        .file_path()
        .ok_or_else(|| FetchError::unsupported(source.as_str(), "not a file:// source"))
}
