//! OpenAI-compatible LLM client.
//!
//! Uses the Chat Completions API in JSON response mode for synthesis and
//! deep dives, and `/audio/transcriptions` for speech. One attempt per call.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ClarityConfig;
use crate::{ClarityError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ERROR_DETAIL_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Authenticated client for one OpenAI-compatible backend
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    transcribe_model: String,
}

impl LlmClient {
    /// `None` when no API key is configured.
    pub fn from_config(config: &ClarityConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("clarity/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            transcribe_model: config.transcribe_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat completion and return the assistant text.
    pub async fn complete_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "Calling {} with prompt length: {}",
            self.model,
            user_prompt.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        let response = Self::check_response_status(response).await?;

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClarityError::Llm(format!("invalid completion body: {e}")))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ClarityError::Llm("empty completion".to_string()));
        }
        debug!("LLM response length: {}", content.len());
        Ok(content)
    }

    /// Transcribe raw audio bytes.
    pub async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<String> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let part = Part::bytes(audio)
            .file_name(format!("audio.{}", extension_for_mime(mime)))
            .mime_str(mime)
            .map_err(|e| ClarityError::Validation(format!("unsupported audio type: {e}")))?;
        let form = Form::new()
            .text("model", self.transcribe_model.clone())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        let response = Self::check_response_status(response).await?;
        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ClarityError::Llm(format!("invalid transcription body: {e}")))?;
        Ok(body.text.trim().to_string())
    }

    async fn check_response_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = Self::extract_error_detail(&body);
        let detail = Self::truncate_error_detail(&detail, MAX_ERROR_DETAIL_CHARS);
        if !detail.is_empty() {
            return Err(ClarityError::Llm(format!("API error {status}: {detail}")));
        }
        Err(ClarityError::Llm(format!("API error {status}")))
    }

    fn extract_error_detail(body: &str) -> String {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return String::new();
        }

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(msg) = value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
            {
                return msg.to_string();
            }
            if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
            if let Some(msg) = value.get("error").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
        }

        trimmed.to_string()
    }

    fn truncate_error_detail(detail: &str, max_chars: usize) -> String {
        if detail.chars().count() <= max_chars {
            return detail.to_string();
        }

        let mut truncated = detail.chars().take(max_chars).collect::<String>();
        truncated.push_str("... [truncated]");
        truncated
    }

    fn map_reqwest_error(e: reqwest::Error) -> ClarityError {
        if e.is_timeout() {
            ClarityError::Llm(format!("timeout: {e}"))
        } else if e.is_connect() {
            ClarityError::Llm(format!("network: {e}"))
        } else {
            ClarityError::Llm(e.to_string())
        }
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or_default().trim() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" => "ogg",
        _ => "webm",
    }
}
