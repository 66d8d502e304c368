//! Pipeline entry points for collector operations.
//!
//! - `schedule`: the fetch → commit loop and its jitter
//! - `shutdown`: signal-driven cancellation
//! - `digest`: payload checksums
//! - `artifact`: destination name templates

pub mod artifact;
pub mod digest;
pub mod schedule;
pub mod shutdown;

pub use artifact::ArtifactNamer;
pub use digest::{Digest, DigestAccumulator};
pub use schedule::{CycleReport, RunSummary, Scheduler, next_delay};
pub use shutdown::spawn_watcher;
