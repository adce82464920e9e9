//! Provider probes against mock HTTP servers.

use pulsecheck::config::{EmailConfig, LlmChatConfig, WebhookConfig};
use pulsecheck::probe::{EmailProbe, LlmChatProbe, Probe, WebhookProbe};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn llm_config(base_url: &str, keys: &[&str], retries: usize) -> LlmChatConfig {
    LlmChatConfig {
        id: "campus-chat".to_string(),
        base_url: base_url.to_string(),
        api_key_env: "API_CAMPUS".to_string(),
        model: "gpt-4o-mini".to_string(),
        system_prompt: "You are a tutor.".to_string(),
        user_message: "Are you there?".to_string(),
        expect_json_keys: keys.iter().map(|k| k.to_string()).collect(),
        retries,
    }
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn test_llm_probe_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Active and ready.")))
        .expect(1)
        .mount(&server)
        .await;

    let probe = LlmChatProbe::new(
        llm_config(&server.uri(), &[], 0),
        Some("sk-test".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("Model replied"));
    let meta = outcome.meta.unwrap();
    assert_eq!(meta["reply"], "Active and ready.");
    assert_eq!(meta["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn test_llm_probe_structured_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
            "```json\n{\"segment\": \"b2c\", \"summary\": \"English for a child\"}\n```",
        )))
        .mount(&server)
        .await;

    let probe = LlmChatProbe::new(
        llm_config(&server.uri(), &["segment", "summary"], 0),
        Some("sk-test".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("Structured reply is valid"));
    assert_eq!(outcome.meta.unwrap()["parsed"]["segment"], "b2c");
}

#[tokio::test]
async fn test_llm_probe_empty_reply_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("   ")))
        .mount(&server)
        .await;

    let probe = LlmChatProbe::new(
        llm_config(&server.uri(), &[], 0),
        Some("sk-test".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("Model returned an empty reply"));
}

#[tokio::test]
async fn test_llm_probe_retries_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Back online.")))
        .mount(&server)
        .await;

    let probe = LlmChatProbe::new(
        llm_config(&server.uri(), &[], 1),
        Some("sk-test".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.meta.unwrap()["reply"], "Back online.");
}

#[tokio::test]
async fn test_llm_probe_rejected_key_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(2)
        .mount(&server)
        .await;

    let probe = LlmChatProbe::new(
        llm_config(&server.uri(), &[], 1),
        Some("sk-bad".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(!outcome.success);
    let message = outcome.message.unwrap();
    assert!(message.starts_with("Chat request failed: "));
    assert!(message.contains("401"));
    assert!(message.contains("invalid api key"));
    assert_eq!(outcome.meta.unwrap()["model"], "gpt-4o-mini");
}

#[tokio::test]
async fn test_llm_probe_unreachable_host_is_a_failure() {
    let probe = LlmChatProbe::new(
        llm_config("http://127.0.0.1:9", &[], 0),
        Some("sk-test".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(!outcome.success);
    assert!(outcome
        .message
        .unwrap()
        .starts_with("Chat request failed: "));
}

fn email_config(endpoint: &str) -> EmailConfig {
    EmailConfig {
        id: "transactional-email".to_string(),
        endpoint: endpoint.to_string(),
        api_key_env: "API_RESEND".to_string(),
        from: "PulseCheck <onboarding@resend.dev>".to_string(),
        to_env: "EMAIL_RECEIVER_TEST".to_string(),
        subject: "[TEST] Connectivity check".to_string(),
        html: "<p>hi</p>".to_string(),
        retries: 0,
    }
}

#[tokio::test]
async fn test_email_probe_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_123"))
        .and(body_partial_json(json!({ "to": "ops@example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "em_42" })))
        .mount(&server)
        .await;

    let probe = EmailProbe::new(
        email_config(&format!("{}/emails", server.uri())),
        Some("re_123".to_string()),
        Some("ops@example.com".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("Email sent, id em_42"));
    assert_eq!(outcome.meta.unwrap()["recipient"], "ops@example.com");
}

#[tokio::test]
async fn test_email_probe_provider_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Invalid `to` field" })),
        )
        .mount(&server)
        .await;

    let probe = EmailProbe::new(
        email_config(&format!("{}/emails", server.uri())),
        Some("re_123".to_string()),
        Some("not-an-email".to_string()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(!outcome.success);
    assert_eq!(
        outcome.message.as_deref(),
        Some("Email provider error: Invalid `to` field")
    );
}

fn webhook_config(expect_status: Option<&str>) -> WebhookConfig {
    WebhookConfig {
        id: "landing-registration".to_string(),
        url_env: "N8N_WEBHOOK_URL".to_string(),
        payload: json!({ "action": "register_user", "source": "pulsecheck" }),
        stamp_timestamp: true,
        expect_status: expect_status.map(str::to_string),
        retries: 0,
    }
}

#[tokio::test]
async fn test_webhook_probe_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/register"))
        .and(body_partial_json(json!({ "action": "register_user" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "row": 17 })),
        )
        .mount(&server)
        .await;

    let probe = WebhookProbe::new(
        webhook_config(Some("ok")),
        Some(format!("{}/webhook/register", server.uri())),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(outcome.success);
    assert_eq!(
        outcome.message.as_deref(),
        Some("Webhook landing-registration OK")
    );
    assert_eq!(outcome.output.unwrap()["row"], 17);

    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(sent["timestamp"].is_string());
}

#[tokio::test]
async fn test_webhook_probe_unexpected_status_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "queued" })))
        .mount(&server)
        .await;

    let probe = WebhookProbe::new(
        webhook_config(Some("ok")),
        Some(server.uri()),
        reqwest::Client::new(),
    );
    let outcome = probe.run().await.unwrap();

    assert!(!outcome.success);
    assert!(outcome
        .message
        .unwrap()
        .starts_with("Unexpected response: "));
}

#[tokio::test]
async fn test_webhook_probe_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let probe = WebhookProbe::new(webhook_config(None), Some(server.uri()), reqwest::Client::new());
    let outcome = probe.run().await.unwrap();

    assert!(!outcome.success);
    assert_eq!(
        outcome.message.as_deref(),
        Some("Webhook responded with status 502")
    );
}
