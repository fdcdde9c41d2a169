//! AI proxy: the contract, its in-process and HTTP implementations, and the
//! LLM client underneath.

mod contract;
mod http;
mod llm;
pub mod parse;
pub mod prompts;
mod service;

pub use contract::{
    DeepDiveRequest, DeepDiveResponse, GenerateRequest, GenerateResponse, ProxyReply,
    ReplyStatus, TranscribeReply, TranscribeRequest,
};
pub use http::HttpAiProxy;
pub use llm::LlmClient;
pub use service::{decode_audio, unconfigured_deep_dive, unconfigured_generate, ProxyService};

use async_trait::async_trait;

use crate::Result;

/// Synthesis, deep-dive and transcription backend.
///
/// An unconfigured backend is reported through [`ProxyReply::Unconfigured`],
/// not as an error. Errors mean invalid input or a failed upstream call.
#[async_trait]
pub trait AiProxy: Send + Sync {
    async fn synthesize(&self, request: &GenerateRequest) -> Result<ProxyReply<GenerateResponse>>;

    async fn deep_dive(&self, request: &DeepDiveRequest) -> Result<ProxyReply<DeepDiveResponse>>;

    async fn transcribe(&self, request: &TranscribeRequest) -> Result<TranscribeReply>;
}
