//! LLM chat completion probe.
//!
//! Sends one system + user exchange to an OpenAI-compatible
//! `/chat/completions` endpoint and checks that a usable reply comes back.

use crate::config::LlmChatConfig;
use crate::models::ProbeOutcome;
use crate::probe::retry::{with_retries, DEFAULT_BACKOFF};
use crate::probe::{missing, Probe, SecretSource};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Message in the chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

/// Chat completion response body (only the fields we read).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmChatProbe {
    config: LlmChatConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmChatProbe {
    pub fn new(config: LlmChatConfig, api_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            config,
            api_key,
            client,
        }
    }

    pub fn from_config(
        config: &LlmChatConfig,
        client: &reqwest::Client,
        secrets: &dyn SecretSource,
    ) -> Self {
        let api_key = secrets.lookup(&config.api_key_env);
        Self::new(config.clone(), api_key, client.clone())
    }

    async fn execute(&self) -> Result<ProbeOutcome> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(ProbeOutcome::fail(missing(&self.config.api_key_env)));
        };

        // Once retries are spent, a rejected call is this probe's failure.
        let reply = match with_retries(self.config.retries, DEFAULT_BACKOFF, || {
            self.send_chat(api_key)
        })
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                return Ok(ProbeOutcome::fail(format!("Chat request failed: {:#}", e))
                    .with_meta(json!({ "model": self.config.model })));
            }
        };

        if reply.trim().is_empty() {
            return Ok(ProbeOutcome::fail("Model returned an empty reply")
                .with_meta(json!({ "model": self.config.model })));
        }

        if self.config.expect_json_keys.is_empty() {
            return Ok(ProbeOutcome::pass("Model replied").with_meta(json!({
                "model": self.config.model,
                "reply": reply,
            })));
        }

        Ok(self.check_json_reply(&reply))
    }

    /// Validate a structured reply against the expected keys.
    fn check_json_reply(&self, reply: &str) -> ProbeOutcome {
        let cleaned = strip_code_fences(reply);
        let parsed: Value = match serde_json::from_str(cleaned) {
            Ok(v) => v,
            Err(e) => {
                return ProbeOutcome::fail(format!("Model did not return valid JSON: {}", e))
                    .with_meta(json!({ "model": self.config.model, "reply": reply }));
            }
        };

        let missing_keys: Vec<&str> = self
            .config
            .expect_json_keys
            .iter()
            .map(String::as_str)
            .filter(|k| parsed.get(k).is_none())
            .collect();

        let meta = json!({
            "model": self.config.model,
            "reply": reply,
            "parsed": parsed,
        });

        if missing_keys.is_empty() {
            ProbeOutcome::pass("Structured reply is valid").with_meta(meta)
        } else {
            ProbeOutcome::fail(format!("Reply is missing keys: {}", missing_keys.join(", ")))
                .with_meta(meta)
        }
    }

    async fn send_chat(&self, api_key: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut messages = Vec::with_capacity(2);
        if !self.config.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: self.config.system_prompt.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: self.config.user_message.clone(),
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
        };

        debug!("Sending chat request to {} for {}", url, self.config.id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request to {} timed out", url)
                } else if e.is_connect() {
                    anyhow::anyhow!("Cannot connect to {}", self.config.base_url)
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("LLM API error {}: {}", status, body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

impl Probe for LlmChatProbe {
    fn run(&self) -> BoxFuture<'_, Result<ProbeOutcome>> {
        Box::pin(self.execute())
    }

    fn kind(&self) -> &str {
        "llm-chat"
    }
}

/// Remove a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
