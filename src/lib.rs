//! PulseCheck - concurrent integration probe runner
//!
//! Runs a registry of independent health probes (LLM chat providers,
//! transactional email, workflow webhooks) concurrently, isolates each
//! probe's failures, and aggregates the outcomes into a single run report.

pub mod cli;
pub mod config;
pub mod models;
pub mod probe;
pub mod registry;
pub mod report;
pub mod runner;
pub mod server;

pub use models::{NormalizedResult, ProbeId, ProbeOutcome, RunReport, RunSummary};
pub use probe::{json_probe_fn, probe_fn, Probe};
pub use registry::{ProbeRegistry, RegistryError};
pub use runner::{RunError, Runner};
