//! Toolkit sessions and their AI output bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StructuredPayload, ThinkingLens, ToolkitType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub label: String,
    #[serde(default)]
    pub content: String,
}

impl StepRecord {
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}

/// Everything a synthesis produces for a session.
///
/// An empty `sentence_of_truth` means the session has none.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiOutputs {
    pub insights: Vec<String>,
    pub sentence_of_truth: String,
    pub necessary_moves: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_payload: Option<StructuredPayload>,
}

impl AiOutputs {
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
            && self.sentence_of_truth.trim().is_empty()
            && self.necessary_moves.is_empty()
            && self.structured_payload.is_none()
    }

    pub fn has_insights(&self) -> bool {
        self.insights.iter().any(|i| !i.trim().is_empty())
    }

    pub fn has_truth(&self) -> bool {
        !self.sentence_of_truth.trim().is_empty()
    }
}

/// Marks that a deep dive replaced the sentence of truth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refinement {
    pub lens: ThinkingLens,
    pub refined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolkitSession {
    pub id: String,
    /// Foreign key; the workspace does not embed its sessions
    pub workspace_id: String,
    pub toolkit_type: ToolkitType,
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub thinking_lens: ThinkingLens,
    #[serde(default)]
    pub outputs: AiOutputs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<Refinement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ToolkitSession {
    /// A fresh session with the toolkit's step schema and no content.
    pub fn new(
        id: String,
        workspace_id: String,
        toolkit_type: ToolkitType,
        now: DateTime<Utc>,
    ) -> Self {
        let steps = toolkit_type
            .steps()
            .iter()
            .map(|t| StepRecord {
                label: t.label.to_string(),
                content: String::new(),
            })
            .collect();

        Self {
            id,
            workspace_id,
            toolkit_type,
            steps,
            thinking_lens: ThinkingLens::default(),
            outputs: AiOutputs::default(),
            refinement: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_step_content(&self) -> bool {
        self.steps.iter().any(StepRecord::has_content)
    }

    /// Whether the step labels still match the toolkit schema exactly.
    pub fn matches_schema(&self) -> bool {
        let schema = self.toolkit_type.steps();
        self.steps.len() == schema.len()
            && self
                .steps
                .iter()
                .zip(schema)
                .all(|(step, template)| step.label == template.label)
    }
}
