//! In-process AI proxy: prompts, one LLM call, strict reply parsing.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, error, info, warn};

use super::contract::{
    DeepDiveRequest, DeepDiveResponse, GenerateRequest, GenerateResponse, ProxyReply,
    TranscribeReply, TranscribeRequest,
};
use super::llm::LlmClient;
use super::parse::{parse_deep_dive_reply, parse_generate_reply};
use super::prompts::{deep_dive_prompt, SynthesisPrompt, SYSTEM_PROMPT};
use super::AiProxy;
use crate::config::ClarityConfig;
use crate::{ClarityError, Result};

const SETUP_HINT: &str =
    "Set OPENAI_API_KEY (or CLARITY_API_KEY) and restart the Clarity server to enable AI synthesis.";
const BROWSER_SPEECH_UNCONFIGURED: &str =
    "Server transcription is not configured. Using your device's speech recognition instead.";
const BROWSER_SPEECH_FAILED: &str =
    "Server transcription failed. Using your device's speech recognition instead.";

/// Fixed `/generate` body returned while no backend is configured
pub fn unconfigured_generate() -> GenerateResponse {
    GenerateResponse {
        insights: vec![format!("AI synthesis is not configured yet. {}", SETUP_HINT)],
        sentence_of_truth: String::new(),
        necessary_moves: vec![
            "Add an API key to the server environment or to config.toml".to_string(),
            "Restart the server with `clarity serve`".to_string(),
            "Run the synthesis again".to_string(),
        ],
        structured_payload: None,
    }
}

/// Fixed `/deep-dive` body returned while no backend is configured
pub fn unconfigured_deep_dive() -> DeepDiveResponse {
    DeepDiveResponse {
        observations: vec![format!("Deep dives need an AI backend. {}", SETUP_HINT)],
        refined_insight: String::new(),
        next_steps: vec![
            "Configure an API key for the Clarity server".to_string(),
            "Try the deep dive again".to_string(),
        ],
    }
}

/// Backend behind the HTTP endpoints
pub struct ProxyService {
    llm: Option<LlmClient>,
}

impl ProxyService {
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    pub fn from_config(config: &ClarityConfig) -> Self {
        let llm = LlmClient::from_config(config);
        match &llm {
            Some(client) => info!("AI backend configured ({})", client.model()),
            None => info!("No API key found, AI endpoints will return setup guidance"),
        }
        Self::new(llm)
    }

    pub fn unconfigured() -> Self {
        Self::new(None)
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }
}

#[async_trait]
impl AiProxy for ProxyService {
    async fn synthesize(&self, request: &GenerateRequest) -> Result<ProxyReply<GenerateResponse>> {
        let Some(llm) = &self.llm else {
            return Ok(ProxyReply::Unconfigured(unconfigured_generate()));
        };
        request.validate()?;

        let prompt = SynthesisPrompt::new(request).build();
        debug!("Synthesis prompt length: {}", prompt.len());
        let text = llm
            .complete_json(SYSTEM_PROMPT, &prompt)
            .await
            .inspect_err(|e| error!("Synthesis request failed: {}", e))?;
        let response =
            parse_generate_reply(&text).inspect_err(|e| error!("Synthesis reply rejected: {}", e))?;

        info!(
            "Synthesized {} insights for {}",
            response.insights.len(),
            request.resolved_toolkit_name()
        );
        Ok(ProxyReply::Generated(response))
    }

    async fn deep_dive(&self, request: &DeepDiveRequest) -> Result<ProxyReply<DeepDiveResponse>> {
        let Some(llm) = &self.llm else {
            return Ok(ProxyReply::Unconfigured(unconfigured_deep_dive()));
        };
        request.validate()?;

        let prompt = deep_dive_prompt(request);
        let text = llm
            .complete_json(SYSTEM_PROMPT, &prompt)
            .await
            .inspect_err(|e| error!("Deep dive request failed: {}", e))?;
        let response = parse_deep_dive_reply(&text)
            .inspect_err(|e| error!("Deep dive reply rejected: {}", e))?;
        Ok(ProxyReply::Generated(response))
    }

    async fn transcribe(&self, request: &TranscribeRequest) -> Result<TranscribeReply> {
        if request.audio.trim().is_empty() {
            return Err(ClarityError::Validation("audio is required".to_string()));
        }
        let Some(llm) = &self.llm else {
            return Ok(TranscribeReply::fallback(BROWSER_SPEECH_UNCONFIGURED));
        };

        let (mime, bytes) = match decode_audio(&request.audio) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Could not decode audio upload: {}", e);
                return Ok(TranscribeReply::fallback(BROWSER_SPEECH_FAILED));
            }
        };

        match llm.transcribe(bytes, &mime).await {
            Ok(text) => Ok(TranscribeReply::Text { text }),
            Err(e) => {
                error!("Transcription failed: {}", e);
                Ok(TranscribeReply::fallback(BROWSER_SPEECH_FAILED))
            }
        }
    }
}

/// Split `data:<mime>[;params];base64,<payload>` into mime type and bytes.
///
/// A bare base64 string is accepted as `audio/webm`.
pub fn decode_audio(audio: &str) -> Result<(String, Vec<u8>)> {
    let audio = audio.trim();
    let (mime, payload) = match audio.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| ClarityError::Validation("data URI has no payload".to_string()))?;
            if !header.ends_with(";base64") {
                return Err(ClarityError::Validation(
                    "data URI is not base64 encoded".to_string(),
                ));
            }
            let mime = header.split(';').next().unwrap_or_default();
            let mime = if mime.is_empty() { "audio/webm" } else { mime };
            (mime.to_string(), payload)
        }
        None => ("audio/webm".to_string(), audio),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ClarityError::Validation(format!("invalid base64 audio: {e}")))?;
    if bytes.is_empty() {
        return Err(ClarityError::Validation("audio is empty".to_string()));
    }
    Ok((mime, bytes))
}
