//! Parsing model replies into proxy responses.
//!
//! Strategy:
//! 1. Try `serde_json::from_str` on the full reply text.
//! 2. If that fails, extract the first balanced `{…}` object and retry.
//! 3. Otherwise the reply is rejected as a whole. There are no partial results.
//!
//! The core fields are strict. A malformed structured payload is dropped
//! with a warning and does not fail the reply.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::contract::{DeepDiveResponse, GenerateResponse};
use crate::model::{StructuredPayload, PAYLOAD_KEYS};
use crate::{ClarityError, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoreReply {
    insights: Vec<String>,
    sentence_of_truth: String,
    necessary_moves: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeepDiveReply {
    observations: Vec<String>,
    refined_insight: String,
    next_steps: Vec<String>,
}

/// Parse a synthesis reply produced by the model.
pub fn parse_generate_reply(text: &str) -> Result<GenerateResponse> {
    generate_from_value(reply_json(text)?)
}

/// Build a [`GenerateResponse`] from an already-decoded JSON body.
pub fn generate_from_value(value: Value) -> Result<GenerateResponse> {
    let core: CoreReply = serde_json::from_value(value.clone())
        .map_err(|e| ClarityError::Parse(format!("synthesis reply: {e}")))?;

    Ok(GenerateResponse {
        insights: clean_list(core.insights),
        sentence_of_truth: core.sentence_of_truth.trim().to_string(),
        necessary_moves: clean_list(core.necessary_moves),
        structured_payload: structured_payload(&value),
    })
}

/// Parse a deep-dive reply produced by the model.
pub fn parse_deep_dive_reply(text: &str) -> Result<DeepDiveResponse> {
    deep_dive_from_value(reply_json(text)?)
}

pub fn deep_dive_from_value(value: Value) -> Result<DeepDiveResponse> {
    let reply: DeepDiveReply = serde_json::from_value(value)
        .map_err(|e| ClarityError::Parse(format!("deep-dive reply: {e}")))?;

    Ok(DeepDiveResponse {
        observations: clean_list(reply.observations),
        refined_insight: reply.refined_insight.trim().to_string(),
        next_steps: clean_list(reply.next_steps),
    })
}

fn reply_json(text: &str) -> Result<Value> {
    let text = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Ok(value);
        }
    }

    if let Some(json_str) = extract_json_object(text) {
        if let Ok(value) = serde_json::from_str::<Value>(json_str) {
            debug!("Recovered JSON object embedded in model reply");
            return Ok(value);
        }
    }

    Err(ClarityError::Parse(
        "model reply did not contain a JSON object".to_string(),
    ))
}

/// First lens/toolkit payload key present in the reply.
fn structured_payload(value: &Value) -> Option<StructuredPayload> {
    let object = value.as_object()?;
    for key in PAYLOAD_KEYS {
        let Some(raw) = object.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        match StructuredPayload::from_wire(key, raw.clone()) {
            Some(Ok(payload)) => return Some(payload),
            Some(Err(e)) => warn!("Dropping malformed {} payload: {}", key, e),
            None => {}
        }
    }
    None
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract the first balanced `{…}` substring, skipping braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return text.get(start..start + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
