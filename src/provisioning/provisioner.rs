//! Submission and polling front of the task engine.
//!
//! # Responsibilities
//! - Validate incoming requests before any task exists
//! - Create the `pending` record and launch its worker
//! - Resolve poll requests to task snapshots
//! - Own the running workers so shutdown can drain them
//!
//! # Design Decisions
//! - Workers are spawned into a `JoinSet`; `submit` never awaits them
//! - No admission control: every accepted request gets its own worker
//! - Finished handles are reaped opportunistically on each submit

use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

use crate::observability::metrics;
use crate::provisioning::dispatcher::ProviderDispatcher;
use crate::provisioning::request::ProvisionRequest;
use crate::provisioning::task::{Task, TaskError, TaskId, TaskStore};
use crate::provisioning::worker::ProvisionWorker;

/// Errors surfaced synchronously to the submitter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("missing required field 'cloudType'")]
    MissingCloudType,
}

/// Errors surfaced synchronously to the poller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("missing task id")]
    MissingId,

    #[error("task not found")]
    NotFound,
}

/// Task engine facade shared by the HTTP handlers.
pub struct Provisioner {
    store: Arc<TaskStore>,
    dispatcher: Arc<ProviderDispatcher>,
    workers: Mutex<JoinSet<()>>,
}

impl Provisioner {
    pub fn new(store: Arc<TaskStore>, dispatcher: Arc<ProviderDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            workers: Mutex::new(JoinSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<ProviderDispatcher> {
        &self.dispatcher
    }

    /// Accept a request, returning its task id without waiting for the worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, request: ProvisionRequest) -> Result<TaskId, SubmitError> {
        let cloud_type = request.normalized_cloud_type();
        if cloud_type.is_empty() {
            return Err(SubmitError::MissingCloudType);
        }

        let id = self.store.create(&cloud_type);
        metrics::record_task_submitted(&self.dispatcher.metric_label(&cloud_type));

        tracing::info!(task_id = %id, cloud_type = %cloud_type, request = ?request, "Task submitted");

        let worker = ProvisionWorker::new(id, request, self.store.clone(), self.dispatcher.clone());

        let mut workers = self.lock_workers();
        while let Some(joined) = workers.try_join_next() {
            log_join_error(joined);
        }
        workers.spawn(worker.run());
        metrics::set_workers_running(workers.len());

        Ok(id)
    }

    /// Current snapshot of a task, by its textual id.
    pub fn poll(&self, raw_id: Option<&str>) -> Result<Task, PollError> {
        let raw_id = raw_id.map(str::trim).filter(|s| !s.is_empty()).ok_or(PollError::MissingId)?;

        // A string that is not a task id was never issued.
        let id: TaskId = raw_id.parse().map_err(|_| PollError::NotFound)?;
        self.store.get(&id).map_err(|e| match e {
            TaskError::NotFound(_) | TaskError::AlreadyTerminal(_) => PollError::NotFound,
        })
    }

    /// Number of worker handles not yet reaped.
    pub fn running_workers(&self) -> usize {
        self.lock_workers().len()
    }

    /// Wait for outstanding workers, up to `grace`.
    ///
    /// Workers still running afterwards are aborted; their drop guards mark
    /// the tasks as failed. Returns the number of aborted workers.
    pub async fn drain(&self, grace: Duration) -> usize {
        let mut workers = std::mem::take(&mut *self.lock_workers());
        if workers.is_empty() {
            return 0;
        }

        tracing::info!(workers = workers.len(), grace_secs = grace.as_secs(), "Draining provisioning workers");

        let waited = tokio::time::timeout(grace, async {
            while let Some(joined) = workers.join_next().await {
                log_join_error(joined);
            }
        })
        .await;

        let aborted = workers.len();
        if waited.is_err() {
            tracing::warn!(aborted, "Grace period elapsed, aborting remaining workers");
            workers.shutdown().await;
        }
        metrics::set_workers_running(0);
        aborted
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        // A poisoned lock only means a panic happened while spawning; the set is still usable.
        self.workers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if !e.is_cancelled() {
            tracing::error!(error = %e, "Provisioning worker terminated abnormally");
        }
    }
}
