//! Storage abstractions for committed artifacts.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── 20260101T120000Z.blob       # Committed artifact (immutable)
//! ├── 20260101T120517Z.blob
//! └── tmp-20260101T121041Z.blob-Xk2p9a   # Orphan left by a failed commit
//! ```
//!
//! Committed names are never modified or replaced. Orphaned `tmp-<name>-*`
//! files hold synced payloads whose rename was refused or failed; they are
//! left for manual recovery.

pub mod local;

use async_trait::async_trait;

use crate::error::StoreError;

// Re-export for convenience
pub use local::DurableStore;

/// Trait for artifact storage backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Commit `payload` under `name`.
    ///
    /// Returns the number of bytes written. Fails without touching an
    /// existing artifact of the same name.
    async fn commit(&self, name: &str, payload: Vec<u8>) -> Result<usize, StoreError>;
}
