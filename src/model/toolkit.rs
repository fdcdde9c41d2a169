//! The fixed catalogue of toolkits and their step schemas.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category a toolkit permanently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolkitCategory {
    Investigate,
    Innovate,
    Validate,
}

impl fmt::Display for ToolkitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Investigate => write!(f, "Investigate"),
            Self::Innovate => write!(f, "Innovate"),
            Self::Validate => write!(f, "Validate"),
        }
    }
}

/// One of the nine guided exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolkitType {
    RootCause,
    AssumptionAudit,
    StakeholderMap,
    Reframe,
    FutureScenarios,
    IdeaForge,
    PreMortem,
    DecisionMatrix,
    ValuesCheck,
}

/// A single prompt in a toolkit's fixed step sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTemplate {
    pub label: &'static str,
    pub prompt: &'static str,
}

/// Headings used for the three AI output fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLabels {
    pub primary: String,
    pub secondary: String,
    pub action: String,
}

impl Default for OutputLabels {
    fn default() -> Self {
        Self {
            primary: "Insights".to_string(),
            secondary: "Sentence of Truth".to_string(),
            action: "Necessary Moves".to_string(),
        }
    }
}

const fn step(label: &'static str, prompt: &'static str) -> StepTemplate {
    StepTemplate { label, prompt }
}

const ROOT_CAUSE_STEPS: &[StepTemplate] = &[
    step("The Problem", "What problem keeps coming back?"),
    step("Where It Shows Up", "When and where does it appear, and who notices first?"),
    step("What You've Tried", "What have you already tried, and what happened?"),
    step("Five Whys", "Ask why it happens, then ask why again. Keep going."),
];

const ASSUMPTION_AUDIT_STEPS: &[StepTemplate] = &[
    step("The Belief", "What belief is this decision resting on?"),
    step("Evidence For", "What supports it?"),
    step("Evidence Against", "What contradicts it, even weakly?"),
    step("If It Were False", "What would you do differently if the belief were wrong?"),
];

const STAKEHOLDER_MAP_STEPS: &[StepTemplate] = &[
    step("The Decision", "What decision or change is on the table?"),
    step("Who Is Affected", "List everyone who gains, loses or has a say."),
    step("What Each Party Needs", "What does each of them need from the outcome?"),
    step("Where Interests Collide", "Where do those needs conflict?"),
];

const REFRAME_STEPS: &[StepTemplate] = &[
    step("The Situation", "Describe the situation plainly."),
    step("Current Framing", "How are you framing it right now?"),
    step("The Opposite View", "Argue the opposite framing as well as you can."),
    step("An Outsider's View", "How would someone from a different field see it?"),
];

const FUTURE_SCENARIOS_STEPS: &[StepTemplate] = &[
    step("The Question", "What future question are you trying to prepare for?"),
    step("Driving Forces", "Which forces will shape the answer?"),
    step("Best Case", "Describe the future where things go right."),
    step("Worst Case", "Describe the future where things go wrong."),
    step("Wildcard", "What surprise would change everything?"),
];

const IDEA_FORGE_STEPS: &[StepTemplate] = &[
    step("The Challenge", "What are you trying to create or solve?"),
    step("Constraints", "What limits are real, and which are assumed?"),
    step("Wild Ideas", "List ideas without judging them."),
    step("Combine & Remix", "Merge two or more ideas into something new."),
];

const PRE_MORTEM_STEPS: &[StepTemplate] = &[
    step("The Plan", "What plan are you about to commit to?"),
    step("It Failed. Why?", "Imagine it is a year later and the plan failed. What went wrong?"),
    step("Early Warning Signs", "What would you notice first if it started failing?"),
    step("Safeguards", "What could you put in place now?"),
];

const DECISION_MATRIX_STEPS: &[StepTemplate] = &[
    step("The Options", "Which options are you choosing between?"),
    step("What Matters Most", "Which criteria matter, and how much?"),
    step("Trade-offs", "What does each option cost you?"),
    step("Gut Check", "Which option do you hope wins, and why?"),
];

const VALUES_CHECK_STEPS: &[StepTemplate] = &[
    step("The Choice", "What choice are you facing?"),
    step("Values at Stake", "Which of your values does it touch?"),
    step("Who You Want to Be", "How would the person you want to be act here?"),
    step("The Aligned Path", "What path honors those values?"),
];

impl ToolkitType {
    pub const ALL: [ToolkitType; 9] = [
        ToolkitType::RootCause,
        ToolkitType::AssumptionAudit,
        ToolkitType::StakeholderMap,
        ToolkitType::Reframe,
        ToolkitType::FutureScenarios,
        ToolkitType::IdeaForge,
        ToolkitType::PreMortem,
        ToolkitType::DecisionMatrix,
        ToolkitType::ValuesCheck,
    ];

    /// Stable key used on the wire and in the snapshot
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RootCause => "root-cause",
            Self::AssumptionAudit => "assumption-audit",
            Self::StakeholderMap => "stakeholder-map",
            Self::Reframe => "reframe",
            Self::FutureScenarios => "future-scenarios",
            Self::IdeaForge => "idea-forge",
            Self::PreMortem => "pre-mortem",
            Self::DecisionMatrix => "decision-matrix",
            Self::ValuesCheck => "values-check",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RootCause => "Root Cause Explorer",
            Self::AssumptionAudit => "Assumption Audit",
            Self::StakeholderMap => "Stakeholder Map",
            Self::Reframe => "Reframe Lab",
            Self::FutureScenarios => "Future Scenarios",
            Self::IdeaForge => "Idea Forge",
            Self::PreMortem => "Pre-Mortem",
            Self::DecisionMatrix => "Decision Matrix",
            Self::ValuesCheck => "Values Check",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::RootCause => "Dig beneath a recurring problem to find what actually drives it.",
            Self::AssumptionAudit => "Surface the beliefs a decision depends on and test them.",
            Self::StakeholderMap => "Map who is affected by a decision and what each party needs.",
            Self::Reframe => "Look at a stuck situation from angles you have not tried.",
            Self::FutureScenarios => {
                "Sketch plausible futures so today's moves hold up in all of them."
            }
            Self::IdeaForge => "Generate and recombine ideas under real constraints.",
            Self::PreMortem => "Imagine the plan failed and work backwards to prevent it.",
            Self::DecisionMatrix => "Weigh options against the criteria that matter to you.",
            Self::ValuesCheck => "Check a choice against the values you want to live by.",
        }
    }

    pub fn category(&self) -> ToolkitCategory {
        match self {
            Self::RootCause | Self::AssumptionAudit | Self::StakeholderMap => {
                ToolkitCategory::Investigate
            }
            Self::Reframe | Self::FutureScenarios | Self::IdeaForge => ToolkitCategory::Innovate,
            Self::PreMortem | Self::DecisionMatrix | Self::ValuesCheck => {
                ToolkitCategory::Validate
            }
        }
    }

    /// The fixed, ordered step schema
    pub fn steps(&self) -> &'static [StepTemplate] {
        match self {
            Self::RootCause => ROOT_CAUSE_STEPS,
            Self::AssumptionAudit => ASSUMPTION_AUDIT_STEPS,
            Self::StakeholderMap => STAKEHOLDER_MAP_STEPS,
            Self::Reframe => REFRAME_STEPS,
            Self::FutureScenarios => FUTURE_SCENARIOS_STEPS,
            Self::IdeaForge => IDEA_FORGE_STEPS,
            Self::PreMortem => PRE_MORTEM_STEPS,
            Self::DecisionMatrix => DECISION_MATRIX_STEPS,
            Self::ValuesCheck => VALUES_CHECK_STEPS,
        }
    }

    pub fn output_labels(&self) -> OutputLabels {
        let (primary, secondary, action) = match self {
            Self::RootCause => ("Root Causes", "Core Realization", "Interventions"),
            Self::AssumptionAudit => ("Hidden Assumptions", "The Truth Beneath", "Tests to Run"),
            Self::StakeholderMap => {
                ("Stakeholder Insights", "Shared Ground", "Conversations to Have")
            }
            Self::Reframe => ("New Angles", "The Reframe", "Experiments"),
            Self::FutureScenarios => ("Signals", "Strategic Truth", "No-Regret Moves"),
            Self::IdeaForge => ("Promising Ideas", "The Breakthrough", "Prototypes"),
            Self::PreMortem => ("Failure Modes", "The Hard Truth", "Safeguards"),
            Self::DecisionMatrix => ("Trade-off Insights", "The Decision", "Commitments"),
            Self::ValuesCheck => ("Value Tensions", "Integrity Statement", "Aligned Actions"),
        };
        OutputLabels {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            action: action.to_string(),
        }
    }
}

impl fmt::Display for ToolkitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ToolkitType {
    type Err = String;

    /// Accepts the wire key (`root-cause`), snake_case, or the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted || t.display_name().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown toolkit: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_each_category_has_three_toolkits() {
        let mut counts: HashMap<ToolkitCategory, usize> = HashMap::new();
        for t in ToolkitType::ALL {
            *counts.entry(t.category()).or_default() += 1;
        }
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&n| n == 3));
    }

    #[test]
    fn test_step_labels_unique_within_toolkit() {
        for t in ToolkitType::ALL {
            let labels: Vec<_> = t.steps().iter().map(|s| s.label).collect();
            let mut dedup = labels.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(labels.len(), dedup.len(), "duplicate label in {}", t.as_str());
            assert!(!labels.is_empty());
        }
    }

    #[test]
    fn test_from_str_variants() {
        assert_eq!("root-cause".parse::<ToolkitType>(), Ok(ToolkitType::RootCause));
        assert_eq!("pre_mortem".parse::<ToolkitType>(), Ok(ToolkitType::PreMortem));
        assert_eq!("Idea Forge".parse::<ToolkitType>(), Ok(ToolkitType::IdeaForge));
        assert!("astrology".parse::<ToolkitType>().is_err());
    }

    #[test]
    fn test_serde_key_matches_as_str() {
        for t in ToolkitType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }
}
