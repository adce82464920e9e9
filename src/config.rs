//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pulsecheck.toml` files. The `[[probes]]` entries form the probe
//! registry; secrets are referenced by environment variable name only.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".pulsecheck.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Trigger server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Registered probes, in registry order.
    #[serde(default = "default_probes")]
    pub probes: Vec<ProbeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            runner: RunnerConfig::default(),
            probes: default_probes(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// HTTP trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment variable holding the shared trigger secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secret_env: default_secret_env(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_secret_env() -> String {
    "CRON_SECRET".to_string()
}

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timeout applied to every outgoing HTTP request made by probes.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Hard deadline per probe. Unset means probes bound their own latency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_seconds: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout(),
            probe_timeout_seconds: None,
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// One `[[probes]]` entry, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProbeConfig {
    LlmChat(LlmChatConfig),
    Email(EmailConfig),
    Webhook(WebhookConfig),
}

impl ProbeConfig {
    pub fn id(&self) -> &str {
        match self {
            ProbeConfig::LlmChat(c) => &c.id,
            ProbeConfig::Email(c) => &c.id,
            ProbeConfig::Webhook(c) => &c.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProbeConfig::LlmChat(_) => "llm-chat",
            ProbeConfig::Email(_) => "email",
            ProbeConfig::Webhook(_) => "webhook",
        }
    }
}

/// OpenAI-compatible chat completion probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmChatConfig {
    pub id: String,

    /// API base URL, without the `/chat/completions` suffix.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default = "default_user_message")]
    pub user_message: String,

    /// When non-empty, the reply must be a JSON object with these keys.
    #[serde(default)]
    pub expect_json_keys: Vec<String>,

    #[serde(default = "default_llm_retries")]
    pub retries: usize,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_user_message() -> String {
    "Reply with a short confirmation that you are available.".to_string()
}

fn default_llm_retries() -> usize {
    3
}

/// Transactional email probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub id: String,

    #[serde(default = "default_email_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    #[serde(default = "default_email_from")]
    pub from: String,

    /// Environment variable holding the recipient address.
    pub to_env: String,

    #[serde(default = "default_email_subject")]
    pub subject: String,

    #[serde(default = "default_email_html")]
    pub html: String,

    #[serde(default)]
    pub retries: usize,
}

fn default_email_endpoint() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_email_from() -> String {
    "PulseCheck <onboarding@resend.dev>".to_string()
}

fn default_email_subject() -> String {
    "[TEST] Connectivity check".to_string()
}

fn default_email_html() -> String {
    "<p>Automated connectivity test. If you can read this, the API key works.</p>".to_string()
}

/// Workflow-automation webhook probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub id: String,

    /// Environment variable holding the webhook URL.
    pub url_env: String,

    /// JSON body sent to the webhook.
    #[serde(default = "default_payload")]
    pub payload: Value,

    /// Add a `timestamp` field to object payloads.
    #[serde(default = "default_true")]
    pub stamp_timestamp: bool,

    /// Required value of the response's `status` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_status: Option<String>,

    #[serde(default)]
    pub retries: usize,
}

fn default_payload() -> Value {
    json!({})
}

fn default_true() -> bool {
    true
}

fn default_probes() -> Vec<ProbeConfig> {
    vec![
        ProbeConfig::LlmChat(LlmChatConfig {
            id: "campus-chat".to_string(),
            base_url: default_llm_base_url(),
            api_key_env: "API_CAMPUS".to_string(),
            model: default_llm_model(),
            system_prompt: "You are a language tutor. Reply confirming you are active.".to_string(),
            user_message: default_user_message(),
            expect_json_keys: Vec::new(),
            retries: default_llm_retries(),
        }),
        ProbeConfig::LlmChat(LlmChatConfig {
            id: "whatsapp-extraction".to_string(),
            base_url: default_llm_base_url(),
            api_key_env: "API_WHATSAPP".to_string(),
            model: default_llm_model(),
            system_prompt: "Return ONLY strict JSON with keys \"segment\" and \"summary\".".to_string(),
            user_message: "[user] Hi, I want English classes for my 10 year old son.".to_string(),
            expect_json_keys: vec!["segment".to_string(), "summary".to_string()],
            retries: default_llm_retries(),
        }),
        ProbeConfig::Email(EmailConfig {
            id: "transactional-email".to_string(),
            endpoint: default_email_endpoint(),
            api_key_env: "API_RESEND".to_string(),
            from: default_email_from(),
            to_env: "EMAIL_RECEIVER_TEST".to_string(),
            subject: default_email_subject(),
            html: default_email_html(),
            retries: 0,
        }),
        ProbeConfig::Webhook(WebhookConfig {
            id: "landing-registration".to_string(),
            url_env: "N8N_WEBHOOK_URL".to_string(),
            payload: json!({
                "action": "register_user",
                "nombreCompleto": "Test Usuario",
                "emailCorporativo": "test@example.com",
                "source": "pulsecheck"
            }),
            stamp_timestamp: true,
            expect_status: Some("ok".to_string()),
            retries: 0,
        }),
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load `.pulsecheck.toml` from `dir`, if present.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE_NAME);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.verbose {
            self.general.verbose = true;
        }

        match &args.command {
            Some(crate::cli::Command::Run { probe_timeout, .. }) => {
                if let Some(secs) = probe_timeout {
                    self.runner.probe_timeout_seconds = Some(*secs);
                }
            }
            Some(crate::cli::Command::Serve {
                host,
                port,
                probe_timeout,
                ..
            }) => {
                if let Some(host) = host {
                    self.server.host = host.clone();
                }
                if let Some(port) = port {
                    self.server.port = *port;
                }
                if let Some(secs) = probe_timeout {
                    self.runner.probe_timeout_seconds = Some(*secs);
                }
            }
            Some(crate::cli::Command::List) | None => {}
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
