// src/models/mod.rs

//! Domain models for the collector.
//!
//! This module contains the data structures shared between fetching,
//! committing and scheduling.

mod attempt;
mod config;
mod source;

// Re-export all public types
pub use attempt::{CorrelationId, FetchAttempt};
pub use config::{BasicAuth, CollectorConfig, Config, FetchConfig, HeaderEntry, ScheduleConfig};
pub use source::{Scheme, SourceDescriptor};
