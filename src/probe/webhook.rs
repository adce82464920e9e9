//! Workflow-automation webhook probe.
//!
//! Posts a configured JSON payload and checks the acknowledgement. A
//! successful response body is passed through as `output`.

use crate::config::WebhookConfig;
use crate::models::ProbeOutcome;
use crate::probe::retry::{with_retries, DEFAULT_BACKOFF};
use crate::probe::{missing, Probe, SecretSource};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

pub struct WebhookProbe {
    config: WebhookConfig,
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookProbe {
    pub fn new(config: WebhookConfig, url: Option<String>, client: reqwest::Client) -> Self {
        Self { config, url, client }
    }

    pub fn from_config(
        config: &WebhookConfig,
        client: &reqwest::Client,
        secrets: &dyn SecretSource,
    ) -> Self {
        Self::new(config.clone(), secrets.lookup(&config.url_env), client.clone())
    }

    /// The body to send, stamped with the current time when configured.
    fn payload(&self) -> Value {
        let mut payload = self.config.payload.clone();
        if self.config.stamp_timestamp {
            if let Value::Object(map) = &mut payload {
                map.insert("timestamp".to_string(), Value::String(Utc::now().to_rfc3339()));
            }
        }
        payload
    }

    async fn execute(&self) -> Result<ProbeOutcome> {
        let Some(url) = self.url.as_deref() else {
            return Ok(ProbeOutcome::fail(missing(&self.config.url_env)));
        };

        let payload = self.payload();
        let response = with_retries(self.config.retries, DEFAULT_BACKOFF, || {
            self.client.post(url).json(&payload).send()
        })
        .await
        .with_context(|| format!("Webhook request for {} failed", self.config.id))?;

        let status = response.status();
        debug!("Webhook {} answered {}", self.config.id, status);

        if !status.is_success() {
            return Ok(ProbeOutcome::fail(format!(
                "Webhook responded with status {}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .context("Webhook response is not valid JSON")?;

        if let Some(expected) = &self.config.expect_status {
            let actual = body.get("status").and_then(Value::as_str);
            if actual != Some(expected.as_str()) {
                return Ok(ProbeOutcome::fail(format!("Unexpected response: {}", body)));
            }
        }

        Ok(ProbeOutcome::pass(format!("Webhook {} OK", self.config.id)).with_output(body))
    }
}

impl Probe for WebhookProbe {
    fn run(&self) -> BoxFuture<'_, Result<ProbeOutcome>> {
        Box::pin(self.execute())
    }

    fn kind(&self) -> &str {
        "webhook"
    }
}
