//! Run orchestration.
//!
//! [`Runner::run_all`] fires every registered probe concurrently, waits for
//! all of them to settle, and hands the complete result set to the report
//! aggregator. A probe that fails, errors, panics or (when a deadline is
//! configured) times out only affects its own result.

pub mod identity;
pub mod normalize;

pub use identity::{next_run_id, RunClock};
pub use normalize::{normalize, Settlement};

use crate::models::{NormalizedResult, ProbeId, RunReport};
use crate::registry::{ProbeRegistry, RegisteredProbe};
use crate::report::aggregate;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Orchestrator-level failure. Never produced by a probe.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("probe {0} produced no result")]
    MissingResult(ProbeId),

    #[error("probe {0} produced more than one result")]
    DuplicateResult(ProbeId),
}

/// Generates the id of each run.
pub type RunIdFn = fn() -> String;

pub struct Runner {
    registry: Arc<ProbeRegistry>,
    probe_timeout: Option<Duration>,
    run_id: RunIdFn,
}

impl Runner {
    pub fn new(registry: Arc<ProbeRegistry>) -> Self {
        Self {
            registry,
            probe_timeout: None,
            run_id: next_run_id,
        }
    }

    /// Give every probe a hard deadline.
    pub fn with_probe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Replace the run id generator.
    pub fn with_run_id(mut self, run_id: RunIdFn) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    /// Run every registered probe once and build the report.
    pub async fn run_all(&self) -> Result<RunReport, RunError> {
        let run_id = (self.run_id)();
        let clock = RunClock::start();
        info!("Starting {} with {} probes", run_id, self.registry.len());

        let results = join_all(self.registry.iter().map(|entry| self.run_one(entry))).await;
        let finished_at = clock.finish();

        self.ensure_complete(&results)?;
        let report = aggregate(run_id, results, clock.started_at(), finished_at)?;

        info!(
            "Finished {} in {}ms: {} passed, {} failed",
            report.run_id, report.duration_ms_total, report.summary.passed, report.summary.failed
        );
        Ok(report)
    }

    /// Execute one probe and capture however it settles.
    async fn run_one(&self, entry: &RegisteredProbe) -> NormalizedResult {
        let started = Instant::now();

        // The call itself happens inside the guarded future, so a panic
        // before the probe's first await is caught too.
        let guarded = AssertUnwindSafe(async { entry.probe.run().await }).catch_unwind();

        let settlement = match self.probe_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(caught) => Settlement::from_caught(caught),
                Err(_) => Settlement::TimedOut(limit),
            },
            None => Settlement::from_caught(guarded.await),
        };

        let duration_ms = started.elapsed().as_millis() as u64;

        match &settlement {
            Settlement::Completed(outcome) => {
                debug!("Probe {} settled in {}ms (success: {})", entry.id, duration_ms, outcome.success)
            }
            Settlement::Failed(err) => warn!("Probe {} returned an error: {:#}", entry.id, err),
            Settlement::Panicked(_) => warn!("Probe {} panicked", entry.id),
            Settlement::TimedOut(limit) => {
                warn!("Probe {} timed out after {:?}", entry.id, limit)
            }
        }

        normalize(entry.id.clone(), settlement, duration_ms)
    }

    /// Every registered probe must own a result slot.
    fn ensure_complete(&self, results: &[NormalizedResult]) -> Result<(), RunError> {
        for entry in self.registry.iter() {
            if !results.iter().any(|r| r.id == entry.id) {
                return Err(RunError::MissingResult(entry.id.clone()));
            }
        }
        Ok(())
    }
}
