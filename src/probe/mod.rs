//! Probes: independent units of work that exercise one external integration.
//!
//! The orchestrator only depends on the [`Probe`] trait. The built-in
//! probe families (LLM chat, transactional email, workflow webhook) are
//! configured from `[[probes]]` entries and built by [`build_probe`].

pub mod email;
pub mod llm;
pub mod retry;
pub mod webhook;

pub use email::EmailProbe;
pub use llm::LlmChatProbe;
pub use webhook::WebhookProbe;

use crate::config::ProbeConfig;
use crate::models::ProbeOutcome;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;

/// A zero-argument asynchronous check.
///
/// Returning `Err` (or panicking) is treated as a crash of this probe
/// only. Probes must not share mutable state with each other.
pub trait Probe: Send + Sync {
    /// Execute the probe once.
    fn run(&self) -> BoxFuture<'_, anyhow::Result<ProbeOutcome>>;

    /// Short description of the probe family, for listings.
    fn kind(&self) -> &str {
        "custom"
    }
}

/// A probe backed by a closure returning a future.
pub struct FnProbe<F> {
    f: F,
}

impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ProbeOutcome>> + Send + 'static,
{
    fn run(&self) -> BoxFuture<'_, anyhow::Result<ProbeOutcome>> {
        Box::pin((self.f)())
    }
}

/// Wrap a closure as a probe.
pub fn probe_fn<F, Fut>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ProbeOutcome>> + Send + 'static,
{
    FnProbe { f }
}

/// A probe whose closure returns a loose JSON result such as
/// `{"success": true, "detalles": ..}`, read with [`ProbeOutcome::from_json`].
pub struct JsonFnProbe<F> {
    f: F,
}

impl<F, Fut> Probe for JsonFnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    fn run(&self) -> BoxFuture<'_, anyhow::Result<ProbeOutcome>> {
        let fut = (self.f)();
        Box::pin(async move { fut.await.map(ProbeOutcome::from_json) })
    }
}

/// Wrap a JSON-returning closure as a probe.
pub fn json_probe_fn<F, Fut>(f: F) -> JsonFnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    JsonFnProbe { f }
}

/// Looks up configuration values (secrets, URLs) by environment variable name.
pub trait SecretSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Reads values from the process environment.
pub struct ProcessEnv;

impl SecretSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl SecretSource for std::collections::HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Build a probe from its configuration entry.
///
/// Secrets are resolved once here; a missing value is reported by the
/// probe at run time instead of failing startup.
pub fn build_probe(
    config: &ProbeConfig,
    client: &reqwest::Client,
    secrets: &dyn SecretSource,
) -> Box<dyn Probe> {
    match config {
        ProbeConfig::LlmChat(cfg) => Box::new(LlmChatProbe::from_config(cfg, client, secrets)),
        ProbeConfig::Email(cfg) => Box::new(EmailProbe::from_config(cfg, client, secrets)),
        ProbeConfig::Webhook(cfg) => Box::new(WebhookProbe::from_config(cfg, client, secrets)),
    }
}

/// Message for a configuration value that was not provided.
pub(crate) fn missing(name: &str) -> String {
    format!("Missing {} in environment", name)
}
