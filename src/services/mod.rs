// src/services/mod.rs

//! Source retrieval services.
//!
//! - `fetcher`: scheme dispatch behind the [`Fetch`] trait
//! - `http`: bounded-redirect HTTP(S) GET
//! - `file`: local file reads

pub mod fetcher;
pub mod file;
pub mod http;

pub use fetcher::{Fetch, SourceFetcher};
pub use http::{FetchOption, HttpFetcher};
