//! Normalization of probe settlements into [`NormalizedResult`]s.

use crate::models::{NormalizedResult, ProbeId, ProbeOutcome, DEFAULT_MESSAGE, UNHANDLED_MESSAGE};
use serde_json::{json, Value};
use std::any::Any;
use std::time::Duration;

/// How a single probe invocation ended.
#[derive(Debug)]
pub enum Settlement {
    /// The probe returned an outcome (passing or failing).
    Completed(ProbeOutcome),
    /// The probe returned an error.
    Failed(anyhow::Error),
    /// The probe panicked; carries the panic message if it had one.
    Panicked(Option<String>),
    /// The probe exceeded the configured deadline.
    TimedOut(Duration),
}

impl Settlement {
    /// Classify the output of a `catch_unwind`-guarded probe future.
    pub fn from_caught(caught: Result<anyhow::Result<ProbeOutcome>, Box<dyn Any + Send>>) -> Self {
        match caught {
            Ok(Ok(outcome)) => Settlement::Completed(outcome),
            Ok(Err(err)) => Settlement::Failed(err),
            Err(payload) => Settlement::Panicked(panic_payload_to_string(payload.as_ref())),
        }
    }
}

fn panic_payload_to_string(payload: &(dyn Any + Send)) -> Option<String> {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        Some((*text).to_string())
    } else {
        payload.downcast_ref::<String>().cloned()
    }
}

/// Turn a settlement into the canonical per-probe record.
pub fn normalize(id: ProbeId, settlement: Settlement, duration_ms: u64) -> NormalizedResult {
    let (success, message, meta) = match settlement {
        Settlement::Completed(outcome) => normalize_outcome(outcome),
        Settlement::Failed(err) => {
            let causes: Vec<String> = err.chain().map(|c| c.to_string()).collect();
            let meta = json!({
                "kind": "error",
                "causes": causes,
                "detail": format!("{:?}", err),
            });
            (false, non_empty_or(err.to_string(), UNHANDLED_MESSAGE), meta)
        }
        Settlement::Panicked(payload) => {
            let message = match payload.as_deref() {
                Some(text) if !text.trim().is_empty() => format!("Probe panicked: {}", text),
                _ => UNHANDLED_MESSAGE.to_string(),
            };
            (false, message, json!({ "kind": "panic", "payload": payload }))
        }
        Settlement::TimedOut(limit) => {
            let limit_ms = limit.as_millis() as u64;
            (
                false,
                format!("Probe timed out after {}ms", limit_ms),
                json!({ "kind": "timeout", "limitMs": limit_ms }),
            )
        }
    };

    NormalizedResult {
        id,
        success,
        message,
        duration_ms,
        meta,
    }
}

/// Apply the default message and the `meta ?? output ?? outcome` chain.
fn normalize_outcome(mut outcome: ProbeOutcome) -> (bool, String, Value) {
    let success = outcome.success;
    let message = non_empty_or(outcome.message.clone().unwrap_or_default(), DEFAULT_MESSAGE);
    let meta = match (outcome.meta.take(), outcome.output.take()) {
        (Some(meta), _) => meta,
        (None, Some(output)) => output,
        (None, None) => serde_json::to_value(&outcome).unwrap_or(Value::Null),
    };
    (success, message, meta)
}

fn non_empty_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}
