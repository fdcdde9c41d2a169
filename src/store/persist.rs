//! Durable snapshot storage behind the store.
//!
//! The store writes its whole state through a [`Persister`] after every
//! mutation. The JSON file implementation keeps one file per storage
//! namespace:
//!   {data_dir}/clarity-storage.json

use crate::{ClarityError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::state::{StoreState, SNAPSHOT_VERSION};

/// Storage namespace the snapshot is keyed under
pub const STORAGE_NAMESPACE: &str = "clarity-storage";

#[async_trait]
pub trait Persister: Send + Sync {
    /// Read the whole snapshot. `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<StoreState>>;

    /// Replace the stored snapshot with `state`.
    async fn save(&self, state: &StoreState) -> Result<()>;

    /// Move an unreadable snapshot out of the way so a fresh one can be
    /// saved without losing it.
    async fn quarantine(&self) -> Result<()> {
        Ok(())
    }
}

/// Pretty-printed JSON snapshot on the local file system.
#[derive(Debug, Clone)]
pub struct JsonFilePersister {
    path: PathBuf,
}

impl JsonFilePersister {
    /// Snapshot file inside `data_dir`, named after the storage namespace.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", STORAGE_NAMESPACE)),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`Persister::quarantine`] moves an unreadable snapshot:
    ///   {data_dir}/clarity-storage.corrupt.json
    pub fn quarantine_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(STORAGE_NAMESPACE);
        self.path.with_file_name(format!("{}.corrupt.json", stem))
    }
}

#[async_trait]
impl Persister for JsonFilePersister {
    async fn load(&self) -> Result<Option<StoreState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let state: StoreState = serde_json::from_str(&content)?;
        if state.version > SNAPSHOT_VERSION {
            return Err(ClarityError::Storage(format!(
                "snapshot version {} is newer than supported version {}",
                state.version, SNAPSHOT_VERSION
            )));
        }

        info!(
            "Loaded snapshot from {:?}: {} workspaces, {} sessions",
            self.path,
            state.workspaces.len(),
            state.sessions.len()
        );
        Ok(Some(state))
    }

    async fn save(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        debug!("Saved snapshot to {:?}", self.path);
        Ok(())
    }

    async fn quarantine(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let target = self.quarantine_path();
        fs::rename(&self.path, &target).await?;
        warn!("Moved unreadable snapshot to {:?}", target);
        Ok(())
    }
}

/// Keeps the last saved snapshot in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersister {
    slot: Arc<Mutex<Option<StoreState>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the persister with an existing snapshot
    pub fn with_state(state: StoreState) -> Self {
        let persister = Self::default();
        *persister.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(state);
        persister
    }

    pub fn snapshot(&self) -> Option<StoreState> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Persister for MemoryPersister {
    async fn load(&self) -> Result<Option<StoreState>> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &StoreState) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

/// Discards every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPersister;

#[async_trait]
impl Persister for NullPersister {
    async fn load(&self) -> Result<Option<StoreState>> {
        Ok(None)
    }

    async fn save(&self, _state: &StoreState) -> Result<()> {
        Ok(())
    }
}
