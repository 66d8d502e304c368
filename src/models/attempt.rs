// src/models/attempt.rs

//! Fetch attempts and their correlation identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::SourceDescriptor;

/// Unique identifier threaded through one attempt's logs and request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh random (v4) identifier.
    ///
    /// Draws from the OS random source and reports its failure instead of
    /// panicking, so the scheduler can skip the cycle.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::correlation(format!("random source unavailable: {e}")))?;
        Ok(Self(uuid::Builder::from_random_bytes(bytes).into_uuid()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Header name carrying the identifier for the given application.
    pub fn header_name(app_name: &str) -> String {
        format!("x-{}-request-id", app_name.to_ascii_lowercase())
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// One execution of the fetcher for one scheduled cycle.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub id: CorrelationId,
    pub source: SourceDescriptor,
    pub started_at: DateTime<Utc>,
}

impl FetchAttempt {
    /// Start a new attempt against `source` with a fresh correlation ID.
    pub fn begin(source: SourceDescriptor) -> Result<Self> {
        Ok(Self {
            id: CorrelationId::generate()?,
            source,
            started_at: Utc::now(),
        })
    }
}
