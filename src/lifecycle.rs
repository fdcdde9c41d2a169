//! Toolkit session lifecycle: start, synthesize, deep dive.
//!
//! Phases are derived from the stored session, never stored themselves:
//! Empty -> InProgress -> Synthesized -> Refined. A new synthesis from any
//! phase replaces the output bundle and drops back to Synthesized.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::ai::{AiProxy, DeepDiveRequest, DeepDiveResponse, GenerateRequest, ProxyReply};
use crate::model::{AiOutputs, ThinkingLens, ToolkitSession, ToolkitType};
use crate::store::{Store, StoreState};
use crate::views::synthesis_context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    InProgress,
    Synthesized,
    Refined,
}

pub fn phase(session: &ToolkitSession) -> SessionPhase {
    if !session.outputs.is_empty() {
        if session.refinement.is_some() {
            SessionPhase::Refined
        } else {
            SessionPhase::Synthesized
        }
    } else if session.has_step_content() {
        SessionPhase::InProgress
    } else {
        SessionPhase::Empty
    }
}

/// Result of [`synthesize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// Model output, already saved on the session
    Generated(AiOutputs),
    /// Setup guidance for display; the session is untouched
    Guidance(AiOutputs),
    Failed(String),
}

impl SynthesisOutcome {
    pub fn outputs(&self) -> Option<&AiOutputs> {
        match self {
            Self::Generated(outputs) | Self::Guidance(outputs) => Some(outputs),
            Self::Failed(_) => None,
        }
    }
}

/// Result of [`deep_dive`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepDiveOutcome {
    Refined(DeepDiveResponse),
    Guidance(DeepDiveResponse),
    Failed(String),
}

/// Open a new session of `toolkit_type`.
///
/// Uses the active workspace when it still exists. Otherwise a workspace
/// named after the toolkit is created and made active.
pub async fn start_toolkit(store: &mut Store, toolkit_type: ToolkitType) -> ToolkitSession {
    let workspace_id = match store.state().active_workspace() {
        Some(workspace) => workspace.id.clone(),
        None => {
            let workspace = store
                .create_workspace(toolkit_type.display_name(), toolkit_type.description())
                .await;
            store.set_active_workspace(Some(workspace.id.clone())).await;
            workspace.id
        }
    };
    store.create_session(workspace_id, toolkit_type).await
}

/// Request for synthesizing `session_id`, or `None` if it does not exist.
pub fn build_synthesis_request(
    state: &StoreState,
    session_id: &str,
    include_context: bool,
) -> Option<GenerateRequest> {
    let session = state.session(session_id)?;
    let toolkit = session.toolkit_type;

    let workspace_context = include_context
        .then(|| synthesis_context(&state.sessions, &session.workspace_id, &session.id))
        .filter(|entries| !entries.is_empty());

    Some(GenerateRequest {
        toolkit_type: Some(toolkit.as_str().to_string()),
        toolkit_name: Some(toolkit.display_name().to_string()),
        steps: session.steps.clone(),
        output_labels: Some(toolkit.output_labels()),
        thinking_lens: session.thinking_lens,
        workspace_context,
        content: None,
        context: None,
    })
}

/// Synthesize a session and save generated output on it.
pub async fn synthesize(
    store: &mut Store,
    proxy: &dyn AiProxy,
    session_id: &str,
    include_context: bool,
) -> SynthesisOutcome {
    let Some(request) = build_synthesis_request(store.state(), session_id, include_context) else {
        return SynthesisOutcome::Failed(format!("session {} not found", session_id));
    };

    match proxy.synthesize(&request).await {
        Ok(ProxyReply::Generated(response)) => {
            let outputs = response.into_outputs();
            if !store.save_ai_outputs(session_id, outputs.clone()).await {
                // Deleted while the request was in flight
                warn!("Session {} vanished before its synthesis landed", session_id);
                return SynthesisOutcome::Failed(format!("session {} not found", session_id));
            }
            info!("Session {} synthesized", session_id);
            SynthesisOutcome::Generated(outputs)
        }
        Ok(ProxyReply::Unconfigured(response)) => {
            SynthesisOutcome::Guidance(response.into_outputs())
        }
        Err(e) => {
            warn!("Synthesis of {} failed: {}", session_id, e);
            SynthesisOutcome::Failed(e.to_string())
        }
    }
}

/// Re-examine one insight through another lens. Never touches the store.
pub async fn deep_dive(
    proxy: &dyn AiProxy,
    insight: &str,
    original_lens: ThinkingLens,
    deep_dive_lens: ThinkingLens,
) -> DeepDiveOutcome {
    let request = DeepDiveRequest {
        insight: insight.to_string(),
        original_lens,
        deep_dive_lens,
    };
    if let Err(e) = request.validate() {
        return DeepDiveOutcome::Failed(e.to_string());
    }
    match proxy.deep_dive(&request).await {
        Ok(ProxyReply::Generated(response)) => DeepDiveOutcome::Refined(response),
        Ok(ProxyReply::Unconfigured(response)) => DeepDiveOutcome::Guidance(response),
        Err(e) => {
            warn!("Deep dive failed: {}", e);
            DeepDiveOutcome::Failed(e.to_string())
        }
    }
}

/// Per-key monotonic tickets for discarding stale responses.
///
/// Take a ticket before sending a request and check it when the reply
/// arrives; only the most recent ticket for a key is current.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    next: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: &str) -> u64 {
        let ticket = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), ticket);
        ticket
    }

    pub fn is_current(&self, key: &str, ticket: u64) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .is_some_and(|&latest| latest == ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{
        unconfigured_deep_dive, unconfigured_generate, GenerateResponse, TranscribeReply,
        TranscribeRequest,
    };
    use crate::{ClarityError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    enum Mode {
        Generate,
        Unconfigured,
        Fail,
    }

    struct MockProxy {
        mode: Mode,
        seen: StdMutex<Vec<GenerateRequest>>,
    }

    impl MockProxy {
        fn new(mode: Mode) -> Self {
            Self {
                mode,
                seen: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AiProxy for MockProxy {
        async fn synthesize(
            &self,
            request: &GenerateRequest,
        ) -> Result<ProxyReply<GenerateResponse>> {
            self.seen.lock().unwrap().push(request.clone());
            match self.mode {
                Mode::Generate => Ok(ProxyReply::Generated(GenerateResponse {
                    insights: vec!["You already know".into()],
                    sentence_of_truth: "It is time to leave".into(),
                    necessary_moves: vec!["Give notice".into()],
                    structured_payload: None,
                })),
                Mode::Unconfigured => Ok(ProxyReply::Unconfigured(unconfigured_generate())),
                Mode::Fail => Err(ClarityError::Llm("API error 500".into())),
            }
        }

        async fn deep_dive(
            &self,
            request: &DeepDiveRequest,
        ) -> Result<ProxyReply<DeepDiveResponse>> {
            request.validate()?;
            match self.mode {
                Mode::Generate => Ok(ProxyReply::Generated(DeepDiveResponse {
                    observations: vec!["o".into()],
                    refined_insight: "sharper".into(),
                    next_steps: vec![],
                })),
                Mode::Unconfigured => Ok(ProxyReply::Unconfigured(unconfigured_deep_dive())),
                Mode::Fail => Err(ClarityError::Parse("garbage".into())),
            }
        }

        async fn transcribe(&self, _request: &TranscribeRequest) -> Result<TranscribeReply> {
            Ok(TranscribeReply::fallback("n/a"))
        }
    }

    async fn store_with_filled_session() -> (Store, String) {
        let mut store = Store::in_memory().await;
        let session = start_toolkit(&mut store, ToolkitType::PreMortem).await;
        store.update_step(&session.id, 0, "Launch the app in May").await;
        (store, session.id)
    }

    #[tokio::test]
    async fn test_start_toolkit_creates_implicit_workspace() {
        let mut store = Store::in_memory().await;
        let first = start_toolkit(&mut store, ToolkitType::Reframe).await;
        assert_eq!(store.workspaces().len(), 1);
        assert_eq!(store.workspaces()[0].title, "Reframe Lab");
        assert_eq!(
            store.state().active_workspace_id.as_deref(),
            Some(first.workspace_id.as_str())
        );

        let second = start_toolkit(&mut store, ToolkitType::IdeaForge).await;
        assert_eq!(second.workspace_id, first.workspace_id);
        assert_eq!(store.workspaces().len(), 1);
    }

    #[tokio::test]
    async fn test_start_toolkit_replaces_dangling_active_workspace() {
        let mut store = Store::in_memory().await;
        store.set_active_workspace(Some("ghost".into())).await;
        let session = start_toolkit(&mut store, ToolkitType::ValuesCheck).await;
        assert_ne!(session.workspace_id, "ghost");
        assert!(store.workspace(&session.workspace_id).is_some());
    }

    #[tokio::test]
    async fn test_phases() {
        let (mut store, id) = store_with_filled_session().await;
        let mut fresh = store.session(&id).unwrap().clone();
        fresh.steps.iter_mut().for_each(|s| s.content.clear());
        assert_eq!(phase(&fresh), SessionPhase::Empty);
        assert_eq!(phase(store.session(&id).unwrap()), SessionPhase::InProgress);

        let proxy = MockProxy::new(Mode::Generate);
        synthesize(&mut store, &proxy, &id, false).await;
        assert_eq!(phase(store.session(&id).unwrap()), SessionPhase::Synthesized);

        store
            .apply_refinement(&id, "sharper", ThinkingLens::Stoic)
            .await;
        assert_eq!(phase(store.session(&id).unwrap()), SessionPhase::Refined);

        synthesize(&mut store, &proxy, &id, false).await;
        assert_eq!(phase(store.session(&id).unwrap()), SessionPhase::Synthesized);
    }

    #[tokio::test]
    async fn test_generated_output_is_saved() {
        let (mut store, id) = store_with_filled_session().await;
        let proxy = MockProxy::new(Mode::Generate);
        let outcome = synthesize(&mut store, &proxy, &id, true).await;

        let SynthesisOutcome::Generated(outputs) = outcome else {
            panic!("expected generated outcome");
        };
        assert_eq!(store.session(&id).unwrap().outputs, outputs);

        let seen = proxy.seen.lock().unwrap();
        assert_eq!(seen[0].toolkit_type.as_deref(), Some("pre-mortem"));
        assert_eq!(seen[0].output_labels.as_ref().unwrap().primary, "Failure Modes");
    }

    #[tokio::test]
    async fn test_guidance_is_not_persisted() {
        let (mut store, id) = store_with_filled_session().await;
        let before = store.session(&id).unwrap().clone();

        let proxy = MockProxy::new(Mode::Unconfigured);
        let outcome = synthesize(&mut store, &proxy, &id, false).await;
        assert!(matches!(outcome, SynthesisOutcome::Guidance(_)));
        assert!(outcome.outputs().is_some());
        assert_eq!(store.session(&id).unwrap(), &before);
    }

    #[tokio::test]
    async fn test_failure_leaves_state_unchanged() {
        let (mut store, id) = store_with_filled_session().await;
        let before = store.state().clone();

        let proxy = MockProxy::new(Mode::Fail);
        let outcome = synthesize(&mut store, &proxy, &id, false).await;
        assert!(matches!(outcome, SynthesisOutcome::Failed(_)));
        assert_eq!(store.state(), &before);
    }

    #[tokio::test]
    async fn test_unknown_session_fails() {
        let mut store = Store::in_memory().await;
        let proxy = MockProxy::new(Mode::Generate);
        let outcome = synthesize(&mut store, &proxy, "missing", false).await;
        assert!(matches!(outcome, SynthesisOutcome::Failed(_)));
        assert!(proxy.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_includes_siblings_only_when_asked() {
        let (mut store, first) = store_with_filled_session().await;
        let proxy = MockProxy::new(Mode::Generate);
        synthesize(&mut store, &proxy, &first, false).await;

        let second = start_toolkit(&mut store, ToolkitType::RootCause).await;
        store.update_step(&second.id, 0, "Scope keeps growing").await;

        let with = build_synthesis_request(store.state(), &second.id, true).unwrap();
        let context = with.workspace_context.unwrap();
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].toolkit, "pre-mortem");
        assert_eq!(context[0].sentence_of_truth.as_deref(), Some("It is time to leave"));

        let without = build_synthesis_request(store.state(), &second.id, false).unwrap();
        assert!(without.workspace_context.is_none());
    }

    #[tokio::test]
    async fn test_deep_dive_outcomes() {
        let ok = deep_dive(
            &MockProxy::new(Mode::Generate),
            "I avoid conflict",
            ThinkingLens::Automatic,
            ThinkingLens::Stoic,
        )
        .await;
        assert!(matches!(ok, DeepDiveOutcome::Refined(ref r) if r.refined_insight == "sharper"));

        let guidance = deep_dive(
            &MockProxy::new(Mode::Unconfigured),
            "x",
            ThinkingLens::Automatic,
            ThinkingLens::Stoic,
        )
        .await;
        assert!(matches!(guidance, DeepDiveOutcome::Guidance(_)));

        let blank = deep_dive(
            &MockProxy::new(Mode::Generate),
            "   ",
            ThinkingLens::Automatic,
            ThinkingLens::Stoic,
        )
        .await;
        assert!(matches!(blank, DeepDiveOutcome::Failed(_)));

        let blank = deep_dive(
            &crate::ai::ProxyService::unconfigured(),
            "",
            ThinkingLens::Automatic,
            ThinkingLens::Stoic,
        )
        .await;
        assert!(matches!(blank, DeepDiveOutcome::Failed(_)));
    }

    #[test]
    fn test_request_sequencer_keeps_latest() {
        let seq = RequestSequencer::new();
        let a = seq.begin("s1");
        let b = seq.begin("s1");
        let other = seq.begin("s2");
        assert!(!seq.is_current("s1", a));
        assert!(seq.is_current("s1", b));
        assert!(seq.is_current("s2", other));
        assert!(!seq.is_current("s3", 1));
    }
}
