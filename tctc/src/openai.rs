//! Advisory provider backed by the OpenAI Responses API.

use serde_json::{Value, json};
use std::time::Duration;
use tctc_common::advisory::{AdvisoryError, AdvisoryProvider, AdvisoryRequest};
use tctc_common::config::AdvisoryConfig;
use tracing::debug;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY: usize = 300;

pub struct OpenAiProvider {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        if !config.enabled {
            return Err(AdvisoryError::Disabled);
        }
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AdvisoryError::NotConfigured("OPENAI_API_KEY is not set".to_string()))?
            .to_string();

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

impl AdvisoryProvider for OpenAiProvider {
    fn suggest(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        let body = json!({
            "model": request.model,
            "input": request.prompt,
        })
        .to_string();

        debug!(
            requirement_id = %request.requirement_id,
            model = %request.model,
            candidates = request.candidate_test_ids.len(),
            "Calling advisory provider"
        );

        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(body)
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(map_transport_error)?;

        if !(200..300).contains(&status) {
            return Err(AdvisoryError::Status {
                status,
                message: error_message(&text),
            });
        }

        let doc: Value = serde_json::from_str(&text)
            .map_err(|e| AdvisoryError::InvalidResponse(format!("response is not JSON: {e}")))?;
        extract_output_text(&doc).ok_or_else(|| {
            AdvisoryError::InvalidResponse("response carries no output text".to_string())
        })
    }
}

fn map_transport_error(err: ureq::Error) -> AdvisoryError {
    match err {
        ureq::Error::Timeout(_) => AdvisoryError::Timeout,
        other => AdvisoryError::Transport(other.to_string()),
    }
}

/// `error.message` from an API error body, else the body itself, shortened.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|doc| {
        doc.pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.chars().count() > MAX_ERROR_BODY {
        let mut short: String = message.chars().take(MAX_ERROR_BODY).collect();
        short.push_str("...");
        short
    } else {
        message
    }
}

/// Text of a Responses API payload: the `output_text` shortcut when the
/// server provides it, else every `output_text` content part of the
/// `output` items, concatenated.
pub(crate) fn extract_output_text(doc: &Value) -> Option<String> {
    if let Some(text) = doc.get("output_text").and_then(Value::as_str)
        && !text.trim().is_empty()
    {
        return Some(text.trim().to_string());
    }

    let parts: Vec<&str> = doc
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content")?.as_array())
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text")?.as_str())
        .collect();

    let joined = parts.concat();
    let joined = joined.trim();
    (!joined.is_empty()).then(|| joined.to_string())
}
