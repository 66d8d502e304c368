// src/services/fetcher.rs

//! Scheme dispatch for source retrieval.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::models::{FetchAttempt, FetchConfig, Scheme};
use crate::services::file;
use crate::services::http::HttpFetcher;

/// Anything that can turn a fetch attempt into a byte payload.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(
        &self,
        attempt: &FetchAttempt,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher selecting HTTP(S) or local-file retrieval by scheme.
pub struct SourceFetcher {
    http: HttpFetcher,
}

impl SourceFetcher {
    pub fn new(config: &FetchConfig, app_name: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpFetcher::new(config, app_name)?,
        })
    }
}

#[async_trait]
impl Fetch for SourceFetcher {
    async fn fetch(
        &self,
        attempt: &FetchAttempt,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        match attempt.source.scheme() {
            Scheme::Http | Scheme::Https => self.http.fetch(attempt, cancel).await,
            Scheme::File => file::read_source(attempt, cancel).await,
        }
    }
}
