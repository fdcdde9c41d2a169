//! Derived views over the store state.
//!
//! Everything here is a pure function of the session and workspace lists and
//! is recomputed on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::{ToolkitCategory, ToolkitSession, ToolkitType, Workspace};
use crate::store::StoreState;

/// Characters kept from each sibling step when building synthesis context
pub const CONTEXT_STEP_EXCERPT_CHARS: usize = 200;
/// Insights contributed per sibling session
pub const CONTEXT_MAX_INSIGHTS: usize = 3;
/// Necessary moves contributed per sibling session
pub const CONTEXT_MAX_MOVES: usize = 2;

/// Sessions sorted by `updated_at` descending, truncated to `n`.
///
/// The sort is stable, so equal timestamps keep insertion order.
pub fn recent_sessions(sessions: &[ToolkitSession], n: usize) -> Vec<&ToolkitSession> {
    let mut sorted: Vec<&ToolkitSession> = sessions.iter().collect();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sorted.truncate(n);
    sorted
}

/// Sessions belonging to `workspace_id`, in insertion order.
pub fn workspace_sessions<'a>(
    sessions: &'a [ToolkitSession],
    workspace_id: &str,
) -> Vec<&'a ToolkitSession> {
    sessions
        .iter()
        .filter(|s| s.workspace_id == workspace_id)
        .collect()
}

/// Rounds half away from zero.
fn round_share(weight: f64, part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (weight * part as f64 / whole as f64).round() as u32
}

/// Workspace clarity score in 0..=100.
///
/// ```text
/// min(20, sessions * 5)
///   + round(30 * with_insights / sessions)
///   + round(30 * with_truth / sessions)
///   + min(20, distinct_toolkits * 4)
/// ```
pub fn clarity_score<'a, I>(sessions: I) -> u8
where
    I: IntoIterator<Item = &'a ToolkitSession>,
{
    let mut count = 0usize;
    let mut with_insights = 0usize;
    let mut with_truth = 0usize;
    let mut toolkits: HashSet<ToolkitType> = HashSet::new();

    for session in sessions {
        count += 1;
        if session.outputs.has_insights() {
            with_insights += 1;
        }
        if session.outputs.has_truth() {
            with_truth += 1;
        }
        toolkits.insert(session.toolkit_type);
    }

    let session_component = (count as u32 * 5).min(20);
    let output_component = round_share(30.0, with_insights, count);
    let truth_component = round_share(30.0, with_truth, count);
    let diversity_component = (toolkits.len() as u32 * 4).min(20);

    let total = session_component + output_component + truth_component + diversity_component;
    total.min(100) as u8
}

/// Aggregates shown on a workspace dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStats {
    pub session_count: usize,
    pub synthesized_count: usize,
    pub truth_count: usize,
    pub insight_count: usize,
    pub move_count: usize,
    pub distinct_toolkits: usize,
    pub categories_used: Vec<ToolkitCategory>,
    pub clarity_score: u8,
    pub last_activity: Option<DateTime<Utc>>,
}

pub fn workspace_stats(sessions: &[ToolkitSession], workspace_id: &str) -> WorkspaceStats {
    let owned = workspace_sessions(sessions, workspace_id);

    let toolkits: HashSet<ToolkitType> = owned.iter().map(|s| s.toolkit_type).collect();
    let mut categories_used: Vec<ToolkitCategory> = Vec::new();
    for category in [
        ToolkitCategory::Investigate,
        ToolkitCategory::Innovate,
        ToolkitCategory::Validate,
    ] {
        if toolkits.iter().any(|t| t.category() == category) {
            categories_used.push(category);
        }
    }

    WorkspaceStats {
        session_count: owned.len(),
        synthesized_count: owned.iter().filter(|s| !s.outputs.is_empty()).count(),
        truth_count: owned.iter().filter(|s| s.outputs.has_truth()).count(),
        insight_count: owned.iter().map(|s| s.outputs.insights.len()).sum(),
        move_count: owned.iter().map(|s| s.outputs.necessary_moves.len()).sum(),
        distinct_toolkits: toolkits.len(),
        categories_used,
        clarity_score: clarity_score(owned.iter().copied()),
        last_activity: owned.iter().map(|s| s.updated_at).max(),
    }
}

/// Case-insensitive substring search.
///
/// Matches toolkit display name, owning workspace title, sentence of truth,
/// any step content and any insight. Keeps the order of `sessions`, so pass
/// [`recent_sessions`] output for recency order. A blank query matches nothing.
pub fn search_sessions<'a, I>(
    sessions: I,
    workspaces: &[Workspace],
    query: &str,
) -> Vec<&'a ToolkitSession>
where
    I: IntoIterator<Item = &'a ToolkitSession>,
{
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let hit = |text: &str| text.to_lowercase().contains(&needle);

    sessions
        .into_iter()
        .filter(|session| {
            let workspace_title = workspaces
                .iter()
                .find(|w| w.id == session.workspace_id)
                .map(|w| w.title.as_str())
                .unwrap_or("");

            hit(session.toolkit_type.display_name())
                || hit(workspace_title)
                || hit(session.outputs.sentence_of_truth.as_str())
                || session.steps.iter().any(|step| hit(step.content.as_str()))
                || session.outputs.insights.iter().any(|insight| hit(insight.as_str()))
        })
        .collect()
}

/// [`search_sessions`] over every session, most recently updated first.
pub fn search_recent<'a>(
    sessions: &'a [ToolkitSession],
    workspaces: &[Workspace],
    query: &str,
) -> Vec<&'a ToolkitSession> {
    search_sessions(recent_sessions(sessions, usize::MAX), workspaces, query)
}

/// One sibling session's contribution to a multi-session synthesis request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceContextEntry {
    pub toolkit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_of_truth: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub necessary_moves: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<ContextStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStep {
    pub label: String,
    pub content: String,
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

/// Context drawn from the other sessions of `workspace_id`.
///
/// `exclude_session_id` (the session being synthesized) is left out, as are
/// siblings that have neither step content nor AI output.
pub fn synthesis_context(
    sessions: &[ToolkitSession],
    workspace_id: &str,
    exclude_session_id: &str,
) -> Vec<WorkspaceContextEntry> {
    workspace_sessions(sessions, workspace_id)
        .into_iter()
        .filter(|s| s.id != exclude_session_id)
        .filter(|s| s.has_step_content() || !s.outputs.is_empty())
        .map(|s| WorkspaceContextEntry {
            toolkit: s.toolkit_type.as_str().to_string(),
            toolkit_name: Some(s.toolkit_type.display_name().to_string()),
            sentence_of_truth: s
                .outputs
                .has_truth()
                .then(|| s.outputs.sentence_of_truth.clone()),
            insights: s
                .outputs
                .insights
                .iter()
                .take(CONTEXT_MAX_INSIGHTS)
                .cloned()
                .collect(),
            necessary_moves: s
                .outputs
                .necessary_moves
                .iter()
                .take(CONTEXT_MAX_MOVES)
                .cloned()
                .collect(),
            steps: s
                .steps
                .iter()
                .filter(|step| step.has_content())
                .map(|step| ContextStep {
                    label: step.label.clone(),
                    content: excerpt(&step.content, CONTEXT_STEP_EXCERPT_CHARS),
                })
                .collect(),
        })
        .collect()
}

/// Look up a session together with its workspace.
///
/// `None` means the session is gone. A `None` workspace means the session is
/// orphaned; callers treat it as gone too unless they can show it standalone.
pub fn resolve_session<'a>(
    state: &'a StoreState,
    session_id: &str,
) -> Option<(&'a ToolkitSession, Option<&'a Workspace>)> {
    let session = state.session(session_id)?;
    Some((session, state.workspace(&session.workspace_id)))
}
