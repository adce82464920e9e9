//! Run identifiers and run timing.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

static LAST_RUN_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Generate a run id of the form `run_<unix-millis>`.
///
/// Ids are strictly increasing within the process: a run starting in the
/// same millisecond as the previous one is moved to the next millisecond.
pub fn next_run_id() -> String {
    let now = Utc::now().timestamp_millis();
    let mut prev = LAST_RUN_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST_RUN_MILLIS.compare_exchange_weak(prev, next, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => return format!("run_{}", next),
            Err(actual) => prev = actual,
        }
    }
}

/// Wall-clock start of a run paired with a monotonic instant.
///
/// `finish` derives the end timestamp from the monotonic clock, so the
/// end never precedes the start even if the system clock is adjusted.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finish(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.started.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.started_at + elapsed
    }
}
