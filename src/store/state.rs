//! The single source of truth for users, workspaces, sessions and settings.
//!
//! Every successful command updates the in-memory state and then writes the
//! full snapshot through the injected [`Persister`] before returning. Write
//! failures are logged and swallowed: the in-memory state stays authoritative.
//!
//! Referential policy: deleting a workspace deletes its sessions. Creating a
//! session does not check that its workspace exists, so orphans can still be
//! loaded from older snapshots; [`Store::prune_orphans`] removes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::persist::{NullPersister, Persister};
use crate::ids::{IdGenerator, UuidIds};
use crate::model::{
    AiOutputs, Refinement, Settings, SettingsPatch, ThinkingLens, ToolkitSession, ToolkitType,
    User, UserPatch, Workspace, WorkspacePatch,
};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Full snapshot of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub version: u32,
    pub user: User,
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(default)]
    pub sessions: Vec<ToolkitSession>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_workspace_id: Option<String>,
}

impl StoreState {
    pub fn new(user: User) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            user,
            workspaces: Vec::new(),
            sessions: Vec::new(),
            settings: Settings::default(),
            active_workspace_id: None,
        }
    }

    pub fn workspace(&self, id: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.id == id)
    }

    pub fn session(&self, id: &str) -> Option<&ToolkitSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// The active workspace, if it is set and still exists
    pub fn active_workspace(&self) -> Option<&Workspace> {
        self.active_workspace_id
            .as_deref()
            .and_then(|id| self.workspace(id))
    }

    fn session_mut(&mut self, id: &str) -> Option<&mut ToolkitSession> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    fn touch_workspace(&mut self, id: &str, now: DateTime<Utc>) {
        if let Some(workspace) = self.workspaces.iter_mut().find(|w| w.id == id) {
            workspace.updated_at = now;
        }
    }
}

/// State container exposing the command operations.
pub struct Store {
    state: StoreState,
    persister: Box<dyn Persister>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    writable: bool,
}

impl Store {
    /// Open the store with UUID identifiers and the system clock.
    pub async fn load(persister: impl Persister + 'static) -> Self {
        Self::open(persister, UuidIds, SystemClock).await
    }

    /// Open the store, reading the whole snapshot from `persister`.
    ///
    /// A missing snapshot starts from defaults (and writes them). An
    /// unreadable one is logged and moved aside before defaults are written;
    /// if it cannot be moved, this store never writes so the file survives.
    pub async fn open(
        persister: impl Persister + 'static,
        ids: impl IdGenerator + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        let (loaded, writable) = match persister.load().await {
            Ok(state) => (state, true),
            Err(e) => {
                warn!("Failed to read stored snapshot, starting fresh: {}", e);
                match persister.quarantine().await {
                    Ok(()) => (None, true),
                    Err(e) => {
                        warn!(
                            "Could not move unreadable snapshot aside, writes disabled: {}",
                            e
                        );
                        (None, false)
                    }
                }
            }
        };

        let fresh = loaded.is_none();
        let state = loaded.unwrap_or_else(|| StoreState::new(User::with_defaults(ids.next_id())));

        let store = Self {
            state,
            persister: Box::new(persister),
            ids: Box::new(ids),
            clock: Box::new(clock),
            writable,
        };
        if fresh {
            store.persist().await;
        }
        store
    }

    /// A store that never touches durable storage
    pub async fn in_memory() -> Self {
        Self::load(NullPersister).await
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.state.workspaces
    }

    pub fn sessions(&self) -> &[ToolkitSession] {
        &self.state.sessions
    }

    pub fn workspace(&self, id: &str) -> Option<&Workspace> {
        self.state.workspace(id)
    }

    pub fn session(&self, id: &str) -> Option<&ToolkitSession> {
        self.state.session(id)
    }

    pub fn user(&self) -> &User {
        &self.state.user
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    // ── Workspaces ──────────────────────────────────────────────

    pub async fn create_workspace(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Workspace {
        let now = self.clock.now();
        let workspace = Workspace {
            id: self.ids.next_id(),
            title: title.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        };
        self.state.workspaces.push(workspace.clone());
        info!("Created workspace {} ({})", workspace.id, workspace.title);

        self.persist().await;
        workspace
    }

    /// Merge `patch` into the workspace. Returns `false` (and does nothing)
    /// when the id does not resolve.
    pub async fn update_workspace(&mut self, id: &str, patch: WorkspacePatch) -> bool {
        let now = self.clock.now();
        let Some(workspace) = self.state.workspaces.iter_mut().find(|w| w.id == id) else {
            debug!("update_workspace: no workspace {}", id);
            return false;
        };
        patch.apply(workspace);
        workspace.updated_at = now;

        self.persist().await;
        true
    }

    /// Delete a workspace and every session that references it.
    pub async fn delete_workspace(&mut self, id: &str) -> bool {
        let before = self.state.workspaces.len();
        self.state.workspaces.retain(|w| w.id != id);
        if self.state.workspaces.len() == before {
            return false;
        }

        let sessions_before = self.state.sessions.len();
        self.state.sessions.retain(|s| s.workspace_id != id);
        if self.state.active_workspace_id.as_deref() == Some(id) {
            self.state.active_workspace_id = None;
        }
        info!(
            "Deleted workspace {} with {} sessions",
            id,
            sessions_before - self.state.sessions.len()
        );

        self.persist().await;
        true
    }

    pub async fn set_active_workspace(&mut self, id: Option<String>) {
        self.state.active_workspace_id = id;
        self.persist().await;
    }

    // ── Sessions ────────────────────────────────────────────────

    /// Start a session of `toolkit_type` in `workspace_id`.
    ///
    /// The workspace id is not validated.
    pub async fn create_session(
        &mut self,
        workspace_id: impl Into<String>,
        toolkit_type: ToolkitType,
    ) -> ToolkitSession {
        let now = self.clock.now();
        let session =
            ToolkitSession::new(self.ids.next_id(), workspace_id.into(), toolkit_type, now);
        self.state.sessions.push(session.clone());
        self.state.touch_workspace(&session.workspace_id, now);
        info!(
            "Created {} session {} in workspace {}",
            toolkit_type.as_str(),
            session.id,
            session.workspace_id
        );

        self.persist().await;
        session
    }

    /// Replace the content of step `index`. Labels never change.
    pub async fn update_step(
        &mut self,
        session_id: &str,
        index: usize,
        content: impl Into<String>,
    ) -> bool {
        let now = self.clock.now();
        let Some(session) = self.state.session_mut(session_id) else {
            return false;
        };
        let Some(step) = session.steps.get_mut(index) else {
            debug!("update_step: session {} has no step {}", session_id, index);
            return false;
        };
        step.content = content.into();
        session.updated_at = now;
        let workspace_id = session.workspace_id.clone();
        self.state.touch_workspace(&workspace_id, now);

        self.persist().await;
        true
    }

    pub async fn set_lens(&mut self, session_id: &str, lens: ThinkingLens) -> bool {
        let now = self.clock.now();
        let Some(session) = self.state.session_mut(session_id) else {
            return false;
        };
        session.thinking_lens = lens;
        session.updated_at = now;
        let workspace_id = session.workspace_id.clone();
        self.state.touch_workspace(&workspace_id, now);

        self.persist().await;
        true
    }

    pub async fn delete_session(&mut self, id: &str) -> bool {
        let Some(pos) = self.state.sessions.iter().position(|s| s.id == id) else {
            return false;
        };
        let removed = self.state.sessions.remove(pos);
        let now = self.clock.now();
        self.state.touch_workspace(&removed.workspace_id, now);
        info!("Deleted session {}", id);

        self.persist().await;
        true
    }

    /// Overwrite the session's whole AI output bundle.
    ///
    /// Clears any deep-dive refinement; unknown sessions are a no-op.
    pub async fn save_ai_outputs(&mut self, session_id: &str, outputs: AiOutputs) -> bool {
        let now = self.clock.now();
        let Some(session) = self.state.session_mut(session_id) else {
            debug!("save_ai_outputs: no session {}", session_id);
            return false;
        };
        session.outputs = outputs;
        session.refinement = None;
        session.updated_at = now;
        let workspace_id = session.workspace_id.clone();
        self.state.touch_workspace(&workspace_id, now);

        self.persist().await;
        true
    }

    /// Merge a deep-dive result into the sentence of truth.
    pub async fn apply_refinement(
        &mut self,
        session_id: &str,
        refined_insight: impl Into<String>,
        lens: ThinkingLens,
    ) -> bool {
        let now = self.clock.now();
        let Some(session) = self.state.session_mut(session_id) else {
            return false;
        };
        session.outputs.sentence_of_truth = refined_insight.into();
        session.refinement = Some(Refinement {
            lens,
            refined_at: now,
        });
        session.updated_at = now;
        let workspace_id = session.workspace_id.clone();
        self.state.touch_workspace(&workspace_id, now);

        self.persist().await;
        true
    }

    /// Remove sessions whose workspace no longer exists.
    pub async fn prune_orphans(&mut self) -> usize {
        let workspace_ids: std::collections::HashSet<&str> =
            self.state.workspaces.iter().map(|w| w.id.as_str()).collect();
        let orphaned: Vec<String> = self
            .state
            .sessions
            .iter()
            .filter(|s| !workspace_ids.contains(s.workspace_id.as_str()))
            .map(|s| s.id.clone())
            .collect();
        if orphaned.is_empty() {
            return 0;
        }

        self.state.sessions.retain(|s| !orphaned.contains(&s.id));
        warn!("Pruned {} orphaned sessions", orphaned.len());

        self.persist().await;
        orphaned.len()
    }

    // ── User & settings ─────────────────────────────────────────

    pub async fn set_user(&mut self, user: User) {
        self.state.user = user;
        self.persist().await;
    }

    pub async fn update_user(&mut self, patch: UserPatch) {
        patch.apply(&mut self.state.user);
        self.persist().await;
    }

    pub async fn update_settings(&mut self, patch: SettingsPatch) {
        patch.apply(&mut self.state.settings);
        self.persist().await;
    }

    /// Wipe everything back to a fresh default state
    pub async fn reset_all(&mut self) {
        self.state = StoreState::new(User::with_defaults(self.ids.next_id()));
        info!("Store reset to defaults");
        self.persist().await;
    }

    async fn persist(&self) {
        if !self.writable {
            debug!("Snapshot write skipped, unreadable snapshot kept on disk");
            return;
        }
        if let Err(e) = self.persister.save(&self.state).await {
            warn!("Failed to persist snapshot (in-memory state kept): {}", e);
        }
    }
}
