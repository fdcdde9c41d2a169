//! Prompt assembly for synthesis and deep-dive requests.

use std::fmt::Write as _;

use super::contract::{DeepDiveRequest, GenerateRequest};
use crate::model::ToolkitType;

pub const SYSTEM_PROMPT: &str = "You are Clarity, a calm and incisive thinking partner. \
You read a person's reflections and return short, specific, honest observations. \
Never flatter, never pad. Respond with a single JSON object and nothing else.";

/// Builds the user prompt for `POST /generate`
pub struct SynthesisPrompt<'a> {
    request: &'a GenerateRequest,
}

impl<'a> SynthesisPrompt<'a> {
    pub fn new(request: &'a GenerateRequest) -> Self {
        Self { request }
    }

    /// Extra response key the model should fill, if any.
    ///
    /// The lens payload wins over the toolkit payload.
    pub fn payload_key(&self) -> Option<&'static str> {
        self.request.thinking_lens.payload_key().or_else(|| {
            (self.request.toolkit() == Some(ToolkitType::StakeholderMap))
                .then_some("stakeholderMatrix")
        })
    }

    pub fn build(&self) -> String {
        let req = self.request;
        let labels = req.resolved_output_labels();
        let lens = req.thinking_lens;
        let mut prompt = String::new();

        let _ = writeln!(prompt, "=== Toolkit ===\n{}", req.resolved_toolkit_name());
        if let Some(toolkit) = req.toolkit() {
            let _ = writeln!(prompt, "{} ({})", toolkit.description(), toolkit.category());
        }

        let _ = writeln!(
            prompt,
            "\n=== Thinking Lens: {} ===\n{}",
            lens.display_name(),
            lens.directive()
        );

        prompt.push_str("\n=== The Person's Reflections ===\n");
        for step in req.steps.iter().filter(|s| s.has_content()) {
            let _ = writeln!(prompt, "## {}\n{}\n", step.label, step.content.trim());
        }
        if let Some(content) = req.content.as_deref().filter(|c| !c.trim().is_empty()) {
            let _ = writeln!(prompt, "{}\n", content.trim());
        }
        if let Some(context) = req.context.as_deref().filter(|c| !c.trim().is_empty()) {
            let _ = writeln!(prompt, "Additional context: {}\n", context.trim());
        }

        if let Some(entries) = req.workspace_context.as_deref().filter(|e| !e.is_empty()) {
            prompt.push_str("=== Earlier Sessions In This Workspace ===\n");
            prompt.push_str("Connect the new reflections to these where it is genuinely useful.\n");
            for entry in entries {
                let name = entry.toolkit_name.as_deref().unwrap_or(&entry.toolkit);
                let _ = writeln!(prompt, "- {}", name);
                for step in &entry.steps {
                    let _ = writeln!(prompt, "  {}: {}", step.label, step.content);
                }
                if let Some(truth) = &entry.sentence_of_truth {
                    let _ = writeln!(prompt, "  Sentence of truth: {}", truth);
                }
                if !entry.insights.is_empty() {
                    let _ = writeln!(prompt, "  Insights: {}", entry.insights.join(" | "));
                }
                if !entry.necessary_moves.is_empty() {
                    let _ = writeln!(prompt, "  Moves: {}", entry.necessary_moves.join(" | "));
                }
            }
            prompt.push('\n');
        }

        prompt.push_str("=== Output ===\nRespond with exactly this JSON shape:\n{\n");
        let _ = writeln!(
            prompt,
            "  \"insights\": [3-5 short strings: {}],",
            labels.primary
        );
        let _ = writeln!(
            prompt,
            "  \"sentenceOfTruth\": \"one sentence: {}\",",
            labels.secondary
        );
        let _ = write!(
            prompt,
            "  \"necessaryMoves\": [2-4 concrete actions: {}]",
            labels.action
        );
        match self.payload_key() {
            Some(key) => {
                let _ = writeln!(prompt, ",\n  \"{}\": {}", key, payload_shape(key));
            }
            None => prompt.push('\n'),
        }
        prompt.push_str("}\nOutput ONLY the JSON object.");

        prompt
    }
}

fn payload_shape(key: &str) -> &'static str {
    match key {
        "systemsDiagram" => {
            "{\"elements\": [strings], \"feedbackLoops\": [strings], \"leveragePoints\": [strings]}"
        }
        "futuresScenarios" => {
            "{\"optimistic\": \"string\", \"pessimistic\": \"string\", \"wildcard\": \"string\"}"
        }
        "ethicalMatrix" => {
            "[{\"stakeholder\": \"string\", \"impact\": \"string\", \"consideration\": \"string\"}]"
        }
        "firstPrinciplesList" => "[strings: fundamental truths]",
        "narrativeArc" => {
            "{\"setup\": \"string\", \"conflict\": \"string\", \"turningPoint\": \"string\", \"resolution\": \"string\"}"
        }
        "stakeholderMatrix" => {
            "[{\"name\": \"string\", \"influence\": \"high|low\", \"interest\": \"high|low\", \"need\": \"string\"}]"
        }
        _ => "{}",
    }
}

/// User prompt for `POST /deep-dive`
pub fn deep_dive_prompt(request: &DeepDiveRequest) -> String {
    format!(
        r#"=== Insight To Re-examine ===
{insight}

It was first reached through the {original} lens.
Look at it again through the {new} lens: {directive}

Respond with a single JSON object:
{{
  "observations": [2-4 strings: what the new lens reveals],
  "refinedInsight": "one sentence: the insight restated through the new lens",
  "nextSteps": [2-3 concrete actions]
}}
Output ONLY the JSON object."#,
        insight = request.insight.trim(),
        original = request.original_lens.display_name(),
        new = request.deep_dive_lens.display_name(),
        directive = request.deep_dive_lens.directive(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StepRecord, ThinkingLens};
    use crate::views::WorkspaceContextEntry;

    fn request(lens: ThinkingLens, toolkit: &str) -> GenerateRequest {
        GenerateRequest {
            toolkit_type: Some(toolkit.into()),
            steps: vec![
                StepRecord {
                    label: "The Decision".into(),
                    content: "Move the team to four-day weeks".into(),
                },
                StepRecord {
                    label: "Who Is Affected".into(),
                    content: String::new(),
                },
            ],
            thinking_lens: lens,
            ..Default::default()
        }
    }

    #[test]
    fn test_prompt_includes_filled_steps_only() {
        let req = request(ThinkingLens::Automatic, "stakeholder-map");
        let prompt = SynthesisPrompt::new(&req).build();
        assert!(prompt.contains("Stakeholder Map"));
        assert!(prompt.contains("four-day weeks"));
        assert!(!prompt.contains("## Who Is Affected"));
        assert!(prompt.contains("Conversations to Have"));
    }

    #[test]
    fn test_payload_key_precedence() {
        let stakeholder = request(ThinkingLens::Automatic, "stakeholder-map");
        assert_eq!(SynthesisPrompt::new(&stakeholder).payload_key(), Some("stakeholderMatrix"));

        let systems = request(ThinkingLens::SystemsThinking, "stakeholder-map");
        let prompt = SynthesisPrompt::new(&systems);
        assert_eq!(prompt.payload_key(), Some("systemsDiagram"));
        assert!(prompt.build().contains("\"systemsDiagram\""));

        let plain = request(ThinkingLens::Stoic, "reframe");
        assert_eq!(SynthesisPrompt::new(&plain).payload_key(), None);
    }

    #[test]
    fn test_prompt_includes_workspace_context() {
        let mut req = request(ThinkingLens::Automatic, "reframe");
        req.workspace_context = Some(vec![WorkspaceContextEntry {
            toolkit: "pre-mortem".into(),
            toolkit_name: Some("Pre-Mortem".into()),
            sentence_of_truth: Some("We are under-staffed".into()),
            insights: vec!["Hiring is slow".into()],
            ..Default::default()
        }]);
        let prompt = SynthesisPrompt::new(&req).build();
        assert!(prompt.contains("Earlier Sessions"));
        assert!(prompt.contains("We are under-staffed"));
        assert!(prompt.contains("Hiring is slow"));
    }

    #[test]
    fn test_deep_dive_prompt_names_both_lenses() {
        let prompt = deep_dive_prompt(&DeepDiveRequest {
            insight: "I fear conflict".into(),
            original_lens: ThinkingLens::Socratic,
            deep_dive_lens: ThinkingLens::Stoic,
        });
        assert!(prompt.contains("I fear conflict"));
        assert!(prompt.contains("Socratic Questioning"));
        assert!(prompt.contains("Stoic"));
        assert!(prompt.contains("refinedInsight"));
    }
}
