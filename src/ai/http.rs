//! Client for a Clarity server reached over HTTP.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::contract::{
    DeepDiveRequest, DeepDiveResponse, GenerateRequest, GenerateResponse, ProxyReply,
    ReplyStatus, TranscribeReply, TranscribeRequest,
};
use super::parse::{deep_dive_from_value, generate_from_value};
use super::AiProxy;
use crate::{ClarityError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// [`AiProxy`] backed by `POST /generate`, `/deep-dive` and `/transcribe`
#[derive(Debug, Clone)]
pub struct HttpAiProxy {
    client: Client,
    base_url: String,
}

impl HttpAiProxy {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("clarity/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let value: Value = response.json().await?;
        if status.is_success() {
            return Ok(value);
        }

        let message = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string();
        if status == StatusCode::BAD_REQUEST {
            Err(ClarityError::Validation(message))
        } else {
            Err(ClarityError::Llm(format!("{status}: {message}")))
        }
    }
}

/// Older servers omit `status`; treat that as generated.
fn reply_status(value: &Value) -> ReplyStatus {
    value
        .get("status")
        .cloned()
        .and_then(|s| serde_json::from_value(s).ok())
        .unwrap_or(ReplyStatus::Generated)
}

#[async_trait]
impl AiProxy for HttpAiProxy {
    async fn synthesize(&self, request: &GenerateRequest) -> Result<ProxyReply<GenerateResponse>> {
        let value = self.post("/generate", request).await?;
        let status = reply_status(&value);
        Ok(ProxyReply::with_status(status, generate_from_value(value)?))
    }

    async fn deep_dive(&self, request: &DeepDiveRequest) -> Result<ProxyReply<DeepDiveResponse>> {
        let value = self.post("/deep-dive", request).await?;
        let status = reply_status(&value);
        Ok(ProxyReply::with_status(status, deep_dive_from_value(value)?))
    }

    async fn transcribe(&self, request: &TranscribeRequest) -> Result<TranscribeReply> {
        let value = self.post("/transcribe", request).await?;
        Ok(serde_json::from_value(value)?)
    }
}
