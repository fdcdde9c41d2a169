//! Request and response bodies of the AI proxy.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{
    AiOutputs, OutputLabels, StepRecord, StructuredPayload, ThinkingLens, ToolkitType,
};
use crate::views::WorkspaceContextEntry;
use crate::{ClarityError, Result};

/// Unknown lens names fall back to `automatic` instead of rejecting the request.
fn lenient_lens<'de, D>(deserializer: D) -> std::result::Result<ThinkingLens, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw {
        Some(name) => name.parse().unwrap_or_else(|_| {
            warn!("Unknown thinking lens {:?}, using automatic", name);
            ThinkingLens::Automatic
        }),
        None => ThinkingLens::Automatic,
    })
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_name: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_labels: Option<OutputLabels>,
    #[serde(default, deserialize_with = "lenient_lens")]
    pub thinking_lens: ThinkingLens,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_context: Option<Vec<WorkspaceContextEntry>>,
    /// Legacy single-text input used before toolkits had step schemas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Legacy free-text context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl GenerateRequest {
    pub fn toolkit(&self) -> Option<ToolkitType> {
        self.toolkit_type.as_deref().and_then(|t| t.parse().ok())
    }

    /// Display name from the request, the toolkit catalogue, or a generic label.
    pub fn resolved_toolkit_name(&self) -> String {
        self.toolkit_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.toolkit().map(|t| t.display_name().to_string()))
            .unwrap_or_else(|| "Thinking Session".to_string())
    }

    pub fn resolved_output_labels(&self) -> OutputLabels {
        self.output_labels
            .clone()
            .or_else(|| self.toolkit().map(|t| t.output_labels()))
            .unwrap_or_default()
    }

    /// Reject requests with nothing to synthesize.
    pub fn validate(&self) -> Result<()> {
        let has_steps = self.steps.iter().any(StepRecord::has_content);
        let has_legacy = self
            .content
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if has_steps || has_legacy {
            Ok(())
        } else {
            Err(ClarityError::Validation(
                "at least one step needs content".to_string(),
            ))
        }
    }
}

/// Whether a reply came from the model or is fixed setup guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Generated,
    Unconfigured,
}

/// A proxy answer. Missing backend credentials is an expected state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyReply<T> {
    Generated(T),
    Unconfigured(T),
}

impl<T> ProxyReply<T> {
    pub fn status(&self) -> ReplyStatus {
        match self {
            Self::Generated(_) => ReplyStatus::Generated,
            Self::Unconfigured(_) => ReplyStatus::Unconfigured,
        }
    }

    pub fn body(&self) -> &T {
        match self {
            Self::Generated(body) | Self::Unconfigured(body) => body,
        }
    }

    pub fn into_body(self) -> T {
        match self {
            Self::Generated(body) | Self::Unconfigured(body) => body,
        }
    }

    pub fn with_status(status: ReplyStatus, body: T) -> Self {
        match status {
            ReplyStatus::Generated => Self::Generated(body),
            ReplyStatus::Unconfigured => Self::Unconfigured(body),
        }
    }
}

/// Synthesis result. The structured payload travels under its own top-level key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub insights: Vec<String>,
    pub sentence_of_truth: String,
    pub necessary_moves: Vec<String>,
    pub structured_payload: Option<StructuredPayload>,
}

impl GenerateResponse {
    pub fn into_outputs(self) -> AiOutputs {
        AiOutputs {
            insights: self.insights,
            sentence_of_truth: self.sentence_of_truth,
            necessary_moves: self.necessary_moves,
            structured_payload: self.structured_payload,
        }
    }
}

impl Serialize for GenerateResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = 3 + usize::from(self.structured_payload.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("insights", &self.insights)?;
        map.serialize_entry("sentenceOfTruth", &self.sentence_of_truth)?;
        map.serialize_entry("necessaryMoves", &self.necessary_moves)?;
        if let Some(payload) = &self.structured_payload {
            map.serialize_entry(payload.wire_key(), &payload.to_wire())?;
        }
        map.end()
    }
}

/// Body of `POST /deep-dive`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepDiveRequest {
    #[serde(default)]
    pub insight: String,
    #[serde(default, deserialize_with = "lenient_lens")]
    pub original_lens: ThinkingLens,
    #[serde(default, deserialize_with = "lenient_lens")]
    pub deep_dive_lens: ThinkingLens,
}

impl DeepDiveRequest {
    pub fn validate(&self) -> Result<()> {
        if self.insight.trim().is_empty() {
            return Err(ClarityError::Validation("insight is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepDiveResponse {
    pub observations: Vec<String>,
    pub refined_insight: String,
    pub next_steps: Vec<String>,
}

/// Body of `POST /transcribe`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribeRequest {
    /// `data:<mime>;base64,<payload>`
    #[serde(default)]
    pub audio: String,
}

/// Transcription answer; the fallback tells the caller to use on-device speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscribeReply {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    UseBrowserSpeech {
        use_browser_speech: bool,
        message: String,
    },
}

impl TranscribeReply {
    pub fn fallback(message: impl Into<String>) -> Self {
        Self::UseBrowserSpeech {
            use_browser_speech: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FuturesScenarios;
    use serde_json::json;

    #[test]
    fn test_generate_request_accepts_minimal_body() {
        let req: GenerateRequest = serde_json::from_value(json!({
            "steps": [{"label": "The Plan", "content": "Ship v2"}],
            "thinkingLens": "no-such-lens"
        }))
        .unwrap();
        assert_eq!(req.thinking_lens, ThinkingLens::Automatic);
        assert!(req.validate().is_ok());
        assert_eq!(req.resolved_toolkit_name(), "Thinking Session");
        assert_eq!(req.resolved_output_labels(), OutputLabels::default());
    }

    #[test]
    fn test_generate_request_requires_content() {
        let req = GenerateRequest {
            steps: vec![StepRecord {
                label: "The Plan".into(),
                content: "   ".into(),
            }],
            ..Default::default()
        };
        assert!(req.validate().unwrap_err().is_validation());

        let legacy = GenerateRequest {
            content: Some("free text".into()),
            ..Default::default()
        };
        assert!(legacy.validate().is_ok());
    }

    #[test]
    fn test_toolkit_defaults_from_catalogue() {
        let req = GenerateRequest {
            toolkit_type: Some("pre-mortem".into()),
            ..Default::default()
        };
        assert_eq!(req.resolved_toolkit_name(), "Pre-Mortem");
        assert_eq!(req.resolved_output_labels().primary, "Failure Modes");
    }

    #[test]
    fn test_generate_response_flattens_payload() {
        let resp = GenerateResponse {
            insights: vec!["a".into()],
            sentence_of_truth: "b".into(),
            necessary_moves: vec![],
            structured_payload: Some(StructuredPayload::FuturesScenarios(FuturesScenarios {
                optimistic: "up".into(),
                pessimistic: "down".into(),
                wildcard: "sideways".into(),
            })),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["sentenceOfTruth"], "b");
        assert_eq!(value["futuresScenarios"]["wildcard"], "sideways");
        assert!(value.get("structuredPayload").is_none());
    }

    #[test]
    fn test_transcribe_reply_shapes() {
        let text = serde_json::to_value(TranscribeReply::Text { text: "hi".into() }).unwrap();
        assert_eq!(text, json!({"text": "hi"}));

        let fallback = serde_json::to_value(TranscribeReply::fallback("use the mic")).unwrap();
        assert_eq!(fallback, json!({"useBrowserSpeech": true, "message": "use the mic"}));

        let parsed: TranscribeReply =
            serde_json::from_value(json!({"useBrowserSpeech": true, "message": "x"})).unwrap();
        assert!(matches!(parsed, TranscribeReply::UseBrowserSpeech { .. }));
    }
}
