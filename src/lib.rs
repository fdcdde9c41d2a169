//! Clarity - guided thinking toolkits
//!
//! A local-first thinking journal:
//! - Workspaces group toolkit sessions (guided multi-step exercises)
//! - An LLM proxy synthesizes insights, a sentence of truth and next moves
//! - All state lives in one persisted snapshot, written through on every change

pub mod ai;
pub mod config;
pub mod export;
pub mod ids;
pub mod lifecycle;
pub mod model;
pub mod server;
pub mod store;
pub mod views;

pub use ai::{AiProxy, HttpAiProxy, LlmClient, ProxyReply, ProxyService};
pub use config::ClarityConfig;
pub use lifecycle::{DeepDiveOutcome, SessionPhase, SynthesisOutcome};
pub use model::{
    AiOutputs, Settings, StepRecord, StructuredPayload, ThinkingLens, ToolkitCategory,
    ToolkitSession, ToolkitType, User, Workspace,
};
pub use store::{JsonFilePersister, MemoryPersister, Persister, Store, StoreState};

/// Result type for Clarity operations
pub type Result<T> = std::result::Result<T, ClarityError>;

/// Errors that can occur in Clarity
#[derive(Debug, thiserror::Error)]
pub enum ClarityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Could not parse AI response: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClarityError {
    /// Whether the error was caused by the caller's input rather than the backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClarityError::Validation(_))
    }
}
