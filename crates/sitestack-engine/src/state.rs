//! Stack state
//!
//! Each stack keeps its last applied resources and outputs in
//! `.sitestack/stacks/<stack>.json` under the project root.

use crate::error::{EngineError, Result};
use crate::input::PropertyMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = "stacks";

/// Everything recorded for one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    pub version: u32,

    pub project: String,

    pub stack: String,

    pub updated_at: DateTime<Utc>,

    /// Resources indexed by URN
    pub resources: BTreeMap<String, ResourceState>,

    /// Stack outputs from the last successful resolution
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
}

impl StackState {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION,
            project: project.into(),
            stack: stack.into(),
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn set_resource(&mut self, state: ResourceState) {
        self.resources.insert(state.urn.clone(), state);
        self.updated_at = Utc::now();
    }

    pub fn remove_resource(&mut self, urn: &str) -> Option<ResourceState> {
        let result = self.resources.remove(urn);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get_resource(&self, urn: &str) -> Option<&ResourceState> {
        self.resources.get(urn)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub urn: String,

    pub token: String,

    pub name: String,

    pub status: ResourceStatus,

    /// Resolved inputs the resource was created with
    pub inputs: PropertyMap,

    /// Attributes reported by the provider
    pub outputs: PropertyMap,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(
        urn: impl Into<String>,
        token: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            urn: urn.into(),
            token: token.into(),
            name: name.into(),
            status: ResourceStatus::Ready,
            inputs: PropertyMap::new(),
            outputs: PropertyMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_inputs(mut self, inputs: PropertyMap) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: PropertyMap) -> Self {
        self.outputs = outputs;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Created and up to date with its recorded inputs
    Ready,
    /// Last create or update failed
    Failed,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Ready => write!(f, "ready"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Reads and writes the state file of one stack
pub struct StateManager {
    /// `.sitestack` directory of the project
    project_dir: PathBuf,
    stack: String,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>, stack: impl Into<String>) -> Self {
        Self {
            project_dir: project_root.as_ref().join(sitestack_config::PROJECT_DIR),
            stack: stack.into(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_dir.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(format!("{}.json", self.stack))
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(format!("{}.json.backup", self.stack))
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(format!("{}.lock", self.stack))
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Loads the stack state; a missing file is an empty state
    pub async fn load(&self, project: &str) -> Result<StackState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!(stack = %self.stack, "State file not found, starting empty");
            return Ok(StackState::new(project, &self.stack));
        }

        let content = fs::read_to_string(&path).await?;
        let state: StackState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(EngineError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }
        if state.stack != self.stack {
            return Err(EngineError::StateError(format!(
                "{} belongs to stack '{}'",
                path.display(),
                state.stack
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Writes the state, keeping the previous file as a backup
    pub async fn save(&self, state: &StackState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Acquires the per-stack lock. Locks older than an hour are stale.
    ///
    /// The lock file is created with `create_new`, so of two concurrent
    /// callers exactly one wins.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();
        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&lock_info)?;

        if !self.create_lock_file(&lock_path, &content).await? {
            let held = self.read_lock(&lock_path).await?;
            let age = Utc::now().signed_duration_since(held.acquired_at);
            if age.num_hours() < 1 {
                return Err(self.locked_error(&held));
            }

            tracing::warn!("Removing stale lock from {}", held.holder);
            match fs::remove_file(&lock_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            // Another process may have taken over the stale lock meanwhile
            if !self.create_lock_file(&lock_path, &content).await? {
                let held = self.read_lock(&lock_path).await?;
                return Err(self.locked_error(&held));
            }
        }

        tracing::debug!(stack = %self.stack, "Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }

    /// Creates the lock file; `false` if it already exists
    async fn create_lock_file(&self, path: &Path, content: &str) -> Result<bool> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(true)
    }

    async fn read_lock(&self, path: &Path) -> Result<LockInfo> {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| {
            EngineError::LockError(format!("unreadable lock file {}: {}", path.display(), e))
        })
    }

    fn locked_error(&self, held: &LockInfo) -> EngineError {
        EngineError::LockError(format!(
            "stack '{}' is locked by {} since {}",
            self.stack, held.holder, held.acquired_at
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the stack lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
