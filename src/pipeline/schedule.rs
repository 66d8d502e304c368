// src/pipeline/schedule.rs

//! Scheduler loop: fetch → digest → commit, repeated on a jittered timer or
//! executed exactly once.

use std::io::Write;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{CorrelationId, FetchAttempt, ScheduleConfig, SourceDescriptor};
use crate::pipeline::artifact::ArtifactNamer;
use crate::pipeline::digest::{Digest, DigestAccumulator};
use crate::services::Fetch;
use crate::storage::ArtifactStore;

/// Outcome of one successful fetch → commit cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub id: CorrelationId,
    pub artifact: String,
    pub bytes_written: usize,
    pub digest: Digest,
}

/// Counters over the lifetime of a scheduler run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Base interval plus a uniform offset in `[-jitter, +jitter]`, whole seconds.
///
/// Saturates at zero when the jitter exceeds the interval, and at
/// `Duration::MAX` on overflow.
pub fn next_delay<R: Rng>(
    interval: Duration,
    jitter: Duration,
    rng: &mut R,
) -> Duration {
    let bound = i64::try_from(jitter.as_secs()).unwrap_or(i64::MAX);
    let offset = if bound == 0 {
        0
    } else {
        rng.gen_range(-bound..=bound)
    };

    if offset >= 0 {
        interval
            .checked_add(Duration::from_secs(offset.unsigned_abs()))
            .unwrap_or(Duration::MAX)
    } else {
        interval.saturating_sub(Duration::from_secs(offset.unsigned_abs()))
    }
}

/// Drives repeated fetch → commit cycles.
pub struct Scheduler<F, S> {
    schedule: ScheduleConfig,
    source: String,
    namer: ArtifactNamer,
    fetcher: F,
    store: S,
    digest: DigestAccumulator,
}

impl<F, S> Scheduler<F, S>
where
    F: Fetch,
    S: ArtifactStore,
{
    pub fn new(
        schedule: ScheduleConfig,
        source: impl Into<String>,
        namer: ArtifactNamer,
        fetcher: F,
        store: S,
    ) -> Self {
        Self {
            schedule,
            source: source.into(),
            namer,
            fetcher,
            store,
            digest: DigestAccumulator::new(),
        }
    }

    /// Run until shutdown, or for exactly one cycle in run-once mode.
    ///
    /// In run-once mode a failed cycle is returned as the error. In repeating
    /// mode failures are logged and the loop carries on.
    pub async fn run(&mut self, shutdown: &CancellationToken) -> Result<RunSummary> {
        if self.schedule.once {
            return self.run_once(shutdown).await;
        }

        if self.namer.is_fixed() {
            log::warn!(
                "Artifact name {:?} is fixed; cycles after the first commit will fail",
                self.namer.template()
            );
        }

        let mut summary = RunSummary::default();
        loop {
            if shutdown.is_cancelled() {
                log::info!("Shutdown requested, not starting a new cycle");
                break;
            }

            summary.cycles += 1;
            match self.run_cycle(shutdown).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    log::error!("Cycle failed: {}", e);
                }
            }

            let delay = next_delay(
                self.schedule.interval(),
                self.schedule.jitter(),
                &mut rand::thread_rng(),
            );
            log::debug!(
                "Next cycle in {}s (interval {}s, jitter ±{}s)",
                delay.as_secs(),
                self.schedule.interval_secs,
                self.schedule.jitter_secs
            );

            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Shutdown requested while idle");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        log::info!(
            "Scheduler stopped after {} cycle(s): {} succeeded, {} failed",
            summary.cycles,
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }

    async fn run_once(&mut self, shutdown: &CancellationToken) -> Result<RunSummary> {
        let report = self.run_cycle(shutdown).await.inspect_err(|e| {
            log::error!("Run-once cycle failed: {}", e);
        })?;
        log::info!(
            "Run-once complete: {} byte(s) committed to {}",
            report.bytes_written,
            report.artifact
        );
        Ok(RunSummary {
            cycles: 1,
            succeeded: 1,
            failed: 0,
        })
    }

    /// Execute a single fetch → commit cycle.
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<CycleReport> {
        let source = SourceDescriptor::parse(&self.source)?;
        let attempt = FetchAttempt::begin(source)?;
        log::info!("[{}] Fetching {}", attempt.id, attempt.source);

        let payload = match self.fetcher.fetch(&attempt, &shutdown.child_token()).await {
            Ok(payload) => payload,
            Err(e) => {
                self.digest.reset();
                log::error!("[{}] Fetch of {} failed: {}", attempt.id, attempt.source, e);
                return Err(e.into());
            }
        };

        self.digest.write_all(&payload)?;
        let digest = self.digest.digest();
        log::debug!(
            "[{}] Fetched {} byte(s), sha256={}",
            attempt.id,
            payload.len(),
            digest
        );

        let artifact = self.namer.name_for(&attempt);
        let bytes_written = self.store.commit(&artifact, payload).await.map_err(|e| {
            log::error!(
                "[{}] Commit of {} failed with {} byte(s) written: {}",
                attempt.id,
                artifact,
                e.bytes_written(),
                e
            );
            AppError::from(e)
        })?;

        log::info!(
            "[{}] Committed {} byte(s) to {}",
            attempt.id,
            bytes_written,
            artifact
        );

        Ok(CycleReport {
            id: attempt.id,
            artifact,
            bytes_written,
            digest,
        })
    }
}
