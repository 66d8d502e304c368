// src/lib.rs

//! Collector Library
//!
//! Periodically fetches a source and durably commits the bytes to a storage
//! directory, never overwriting an existing artifact.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
