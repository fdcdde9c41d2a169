//! Thinking lenses: the analytical stance applied to a synthesis request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThinkingLens {
    #[default]
    Automatic,
    FirstPrinciples,
    SystemsThinking,
    Futures,
    Ethical,
    Narrative,
    Socratic,
    DevilsAdvocate,
    Inversion,
    SecondOrder,
    Lateral,
    DesignThinking,
    Stoic,
    Scientific,
    Economic,
    Pragmatic,
}

impl ThinkingLens {
    pub const ALL: [ThinkingLens; 16] = [
        ThinkingLens::Automatic,
        ThinkingLens::FirstPrinciples,
        ThinkingLens::SystemsThinking,
        ThinkingLens::Futures,
        ThinkingLens::Ethical,
        ThinkingLens::Narrative,
        ThinkingLens::Socratic,
        ThinkingLens::DevilsAdvocate,
        ThinkingLens::Inversion,
        ThinkingLens::SecondOrder,
        ThinkingLens::Lateral,
        ThinkingLens::DesignThinking,
        ThinkingLens::Stoic,
        ThinkingLens::Scientific,
        ThinkingLens::Economic,
        ThinkingLens::Pragmatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::FirstPrinciples => "first-principles",
            Self::SystemsThinking => "systems-thinking",
            Self::Futures => "futures",
            Self::Ethical => "ethical",
            Self::Narrative => "narrative",
            Self::Socratic => "socratic",
            Self::DevilsAdvocate => "devils-advocate",
            Self::Inversion => "inversion",
            Self::SecondOrder => "second-order",
            Self::Lateral => "lateral",
            Self::DesignThinking => "design-thinking",
            Self::Stoic => "stoic",
            Self::Scientific => "scientific",
            Self::Economic => "economic",
            Self::Pragmatic => "pragmatic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Automatic => "Automatic",
            Self::FirstPrinciples => "First Principles",
            Self::SystemsThinking => "Systems Thinking",
            Self::Futures => "Futures Thinking",
            Self::Ethical => "Ethical Lens",
            Self::Narrative => "Narrative",
            Self::Socratic => "Socratic Questioning",
            Self::DevilsAdvocate => "Devil's Advocate",
            Self::Inversion => "Inversion",
            Self::SecondOrder => "Second-Order Effects",
            Self::Lateral => "Lateral Thinking",
            Self::DesignThinking => "Design Thinking",
            Self::Stoic => "Stoic",
            Self::Scientific => "Scientific Method",
            Self::Economic => "Economic",
            Self::Pragmatic => "Pragmatic",
        }
    }

    /// Instruction injected into the synthesis prompt
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Automatic => "Choose whichever analytical approach best fits the material.",
            Self::FirstPrinciples => {
                "Break the situation down to fundamental truths and rebuild the reasoning from there."
            }
            Self::SystemsThinking => {
                "Look for feedback loops, delays and leverage points between the parts."
            }
            Self::Futures => {
                "Project how the situation could unfold across several plausible futures."
            }
            Self::Ethical => "Weigh duties, consequences and fairness to everyone affected.",
            Self::Narrative => {
                "Treat the situation as a story: who wants what, what stands in the way, how it turns."
            }
            Self::Socratic => "Question every claim until the underlying belief is exposed.",
            Self::DevilsAdvocate => "Argue hard against the writer's current position.",
            Self::Inversion => "Ask what would guarantee failure and work backwards from it.",
            Self::SecondOrder => "Follow each consequence to its consequences.",
            Self::Lateral => "Make unexpected connections and challenge the obvious routes.",
            Self::DesignThinking => {
                "Center the people involved, their needs and quick experiments."
            }
            Self::Stoic => "Separate what is within the writer's control from what is not.",
            Self::Scientific => {
                "Form hypotheses and name the evidence that would confirm or refute them."
            }
            Self::Economic => "Examine incentives, opportunity costs and scarce resources.",
            Self::Pragmatic => {
                "Focus on what works, with the smallest next step that moves things forward."
            }
        }
    }

    /// Response key for the lens-specific structured payload, if the lens has one
    pub fn payload_key(&self) -> Option<&'static str> {
        match self {
            Self::SystemsThinking => Some("systemsDiagram"),
            Self::Futures => Some("futuresScenarios"),
            Self::Ethical => Some("ethicalMatrix"),
            Self::FirstPrinciples => Some("firstPrinciplesList"),
            Self::Narrative => Some("narrativeArc"),
            _ => None,
        }
    }
}

impl fmt::Display for ThinkingLens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ThinkingLens {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == wanted || l.display_name().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown thinking lens: {}", s))
    }
}
