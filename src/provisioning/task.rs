//! Task records and the in-memory task store.
//!
//! # Responsibilities
//! - Allocate task ids and insert `pending` records
//! - Serve snapshots to pollers
//! - Apply the single pending -> terminal transition
//!
//! # Design Decisions
//! - Records live in a `DashMap`; a terminal write swaps the state under the
//!   shard write lock, so a reader sees either the old or the new record
//! - `TaskState` carries the result/error, so a record can never hold both
//! - Nothing is persisted; a restart forgets every task

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::provisioning::driver::ProvisionStep;

/// Opaque task identifier (random UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Lifecycle state of a task, serialized as `{"status": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Done {
        /// Public address reported by the provider.
        result: String,
    },
    Failed {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<ProvisionStep>,
    },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Pending)
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Done { .. } => "done",
            TaskState::Failed { .. } => "failed",
        }
    }
}

/// Terminal outcome written by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Done(String),
    Failed(TaskFailure),
}

/// Failure detail of a terminal `failed` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub error: String,
    pub provider: Option<String>,
    pub step: Option<ProvisionStep>,
}

impl TaskFailure {
    /// A failure with no provider context.
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            provider: None,
            step: None,
        }
    }
}

impl From<TaskOutcome> for TaskState {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Done(result) => TaskState::Done { result },
            TaskOutcome::Failed(failure) => TaskState::Failed {
                error: failure.error,
                provider: failure.provider,
                step: failure.step,
            },
        }
    }
}

/// Snapshot of a task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub cloud_type: String,
    #[serde(flatten)]
    pub state: TaskState,
    /// Seconds since the unix epoch.
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task {0} already reached a terminal state")]
    AlreadyTerminal(TaskId),
}

/// Process-wide task registry.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: DashMap<TaskId, Task>,
    pending: AtomicUsize,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new `pending` task and return its id.
    pub fn create(&self, cloud_type: &str) -> TaskId {
        let id = TaskId::new();
        let task = Task {
            id,
            cloud_type: cloud_type.to_string(),
            state: TaskState::Pending,
            created_at: unix_now(),
            finished_at: None,
        };
        // Counted before insertion so a racing terminal write cannot underflow.
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tasks.insert(id, task);
        id
    }

    /// Current snapshot of a task.
    pub fn get(&self, id: &TaskId) -> Result<Task, TaskError> {
        self.tasks
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(TaskError::NotFound(*id))
    }

    /// Move a pending task to its terminal state.
    pub fn set_terminal(&self, id: &TaskId, outcome: TaskOutcome) -> Result<(), TaskError> {
        let mut entry = self.tasks.get_mut(id).ok_or(TaskError::NotFound(*id))?;
        if entry.state.is_terminal() {
            return Err(TaskError::AlreadyTerminal(*id));
        }
        entry.state = outcome.into();
        entry.finished_at = Some(unix_now());
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    /// Total number of tasks ever created in this process.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks still waiting on their worker.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
