//! Transactional email probe.

use crate::config::EmailConfig;
use crate::models::ProbeOutcome;
use crate::probe::retry::{with_retries, DEFAULT_BACKOFF};
use crate::probe::{missing, Probe, SecretSource};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

pub struct EmailProbe {
    config: EmailConfig,
    api_key: Option<String>,
    recipient: Option<String>,
    client: reqwest::Client,
}

impl EmailProbe {
    pub fn new(
        config: EmailConfig,
        api_key: Option<String>,
        recipient: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            api_key,
            recipient,
            client,
        }
    }

    pub fn from_config(
        config: &EmailConfig,
        client: &reqwest::Client,
        secrets: &dyn SecretSource,
    ) -> Self {
        Self::new(
            config.clone(),
            secrets.lookup(&config.api_key_env),
            secrets.lookup(&config.to_env),
            client.clone(),
        )
    }

    async fn execute(&self) -> Result<ProbeOutcome> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ProbeOutcome::fail(missing(&self.config.api_key_env)));
        };
        let Some(recipient) = self.recipient.as_deref() else {
            return Ok(ProbeOutcome::fail(missing(&self.config.to_env)));
        };

        let (status, body) = with_retries(self.config.retries, DEFAULT_BACKOFF, || {
            self.send(api_key, recipient)
        })
        .await?;

        if !status.is_success() {
            let reason = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            return Ok(ProbeOutcome::fail(format!("Email provider error: {}", reason)).with_meta(body));
        }

        match body.get("id").and_then(Value::as_str) {
            Some(id) => Ok(ProbeOutcome::pass(format!("Email sent, id {}", id)).with_meta(json!({
                "id": id,
                "recipient": recipient,
            }))),
            None => Ok(ProbeOutcome::fail("Email provider response has no id").with_meta(body)),
        }
    }

    async fn send(&self, api_key: &str, recipient: &str) -> Result<(reqwest::StatusCode, Value)> {
        let request = SendEmailRequest {
            from: &self.config.from,
            to: recipient,
            subject: &self.config.subject,
            html: &self.config.html,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach email provider at {}", self.config.endpoint))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        // Server errors are worth another attempt; client errors are final.
        if status.is_server_error() {
            anyhow::bail!("Email provider error {}: {}", status, body);
        }

        Ok((status, body))
    }
}

impl Probe for EmailProbe {
    fn run(&self) -> BoxFuture<'_, Result<ProbeOutcome>> {
        Box::pin(self.execute())
    }

    fn kind(&self) -> &str {
        "email"
    }
}
