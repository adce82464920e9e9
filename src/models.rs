//! Data models for probe runs.
//!
//! This module contains the core data structures shared by the registry,
//! the orchestrator and the report aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message used when a probe reports no message of its own.
pub const DEFAULT_MESSAGE: &str = "OK";

/// Message used when a probe crashes without any message.
pub const UNHANDLED_MESSAGE: &str = "Unhandled exception";

/// Unique name of a probe within a registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeId(String);

impl ProbeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProbeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProbeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What a probe returns when it settles normally.
///
/// Only `success` and `message` are interpreted. `meta` is the designated
/// auxiliary payload; `output` is accepted as a secondary payload slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}

impl ProbeOutcome {
    /// A passing outcome with a message.
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A failing outcome with a message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Build an outcome from a loosely shaped JSON value.
    ///
    /// `success` follows JSON truthiness, `message` is taken only when it is
    /// a string. A non-object value is carried as `output` and its own
    /// truthiness decides `success`.
    pub fn from_json(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Self {
                    success: truthy(&other),
                    output: Some(other),
                    ..Self::default()
                }
            }
        };

        let success = map.get("success").map(truthy).unwrap_or(false);
        let message = match map.get("message") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        let meta = map.remove("meta").filter(|v| !v.is_null());
        let output = map.remove("output").filter(|v| !v.is_null());

        if meta.is_none() && output.is_none() {
            // Nothing designated: keep the whole record as the payload.
            let rest = Value::Object(map);
            return Self {
                success,
                message,
                meta: None,
                output: Some(rest),
            };
        }

        Self {
            success,
            message,
            meta,
            output,
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Canonical per-probe record after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub id: ProbeId,
    pub success: bool,
    pub message: String,
    pub duration_ms: u64,
    pub meta: Value,
}

/// Pass/fail counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Count the success flags of a result set.
    pub fn from_results(results: &[NormalizedResult]) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
        }
    }
}

/// The terminal artifact of one orchestration pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms_total: u64,
    pub all_passed: bool,
    pub summary: RunSummary,
    pub failed_ids: Vec<ProbeId>,
    pub failure_details: Vec<String>,
    pub results: Vec<NormalizedResult>,
}

impl RunReport {
    /// Look up the result for a probe id.
    pub fn result(&self, id: &str) -> Option<&NormalizedResult> {
        self.results.iter().find(|r| r.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_probe_id_display() {
        let id = ProbeId::from("campus-chat");
        assert_eq!(id.to_string(), "campus-chat");
        assert_eq!(id.as_str(), "campus-chat");
    }

    #[test]
    fn test_outcome_from_json_with_meta() {
        let outcome = ProbeOutcome::from_json(json!({
            "success": true,
            "message": "Boca webhook OK",
            "meta": {"status": "ok"},
            "output": {"ignored": true}
        }));
        assert!(outcome.success);
        assert_eq!(outcome.message.as_deref(), Some("Boca webhook OK"));
        assert_eq!(outcome.meta, Some(json!({"status": "ok"})));
        assert_eq!(outcome.output, Some(json!({"ignored": true})));
    }

    #[test]
    fn test_outcome_from_json_keeps_ad_hoc_fields() {
        let outcome = ProbeOutcome::from_json(json!({
            "success": 1,
            "responseFromAI": "hola"
        }));
        assert!(outcome.success);
        assert!(outcome.message.is_none());
        assert_eq!(outcome.output, Some(json!({"success": 1, "responseFromAI": "hola"})));
    }

    #[test]
    fn test_outcome_from_json_non_object() {
        let outcome = ProbeOutcome::from_json(json!(null));
        assert!(!outcome.success);
        assert_eq!(outcome.output, Some(Value::Null));

        let outcome = ProbeOutcome::from_json(json!({"message": 42}));
        assert!(!outcome.success);
        assert!(outcome.message.is_none());
    }

    #[test]
    fn test_summary_from_results() {
        let results = vec![
            NormalizedResult {
                id: "a".into(),
                success: true,
                message: "OK".to_string(),
                duration_ms: 3,
                meta: Value::Null,
            },
            NormalizedResult {
                id: "b".into(),
                success: false,
                message: "net down".to_string(),
                duration_ms: 1,
                meta: Value::Null,
            },
        ];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary, RunSummary { total: 2, passed: 1, failed: 1 });
    }

    #[test]
    fn test_normalized_result_is_camel_case() {
        let result = NormalizedResult {
            id: "a".into(),
            success: true,
            message: "OK".to_string(),
            duration_ms: 12,
            meta: json!({"k": "v"}),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["durationMs"], 12);
        assert_eq!(json["id"], "a");
    }
}
