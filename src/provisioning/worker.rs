//! Per-task provisioning worker.
//!
//! # State Machine
//! ```text
//! pending ──dispatch ok──────▶ done   (result = address)
//!    │
//!    ├──driver error─────────▶ failed (error = driver message)
//!    ├──unsupported type─────▶ failed (no driver invoked)
//!    ├──driver panic─────────▶ failed
//!    └──worker dropped───────▶ failed (drop guard)
//! ```
//!
//! # Design Decisions
//! - One worker per task; it only ever writes its own record
//! - The terminal write is owned by `TerminalGuard`, so every exit path of the
//!   worker future records a terminal state
//! - No retries and no timeout around the driver call

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics;
use crate::provisioning::dispatcher::ProviderDispatcher;
use crate::provisioning::request::ProvisionRequest;
use crate::provisioning::task::{TaskFailure, TaskId, TaskOutcome, TaskStore};

/// Message recorded when a worker is torn down before finishing.
pub const ABORTED_MESSAGE: &str = "provisioning worker stopped before completion";

/// Asynchronous unit of work owning one task.
pub struct ProvisionWorker {
    id: TaskId,
    request: ProvisionRequest,
    store: Arc<TaskStore>,
    dispatcher: Arc<ProviderDispatcher>,
}

impl ProvisionWorker {
    pub fn new(
        id: TaskId,
        request: ProvisionRequest,
        store: Arc<TaskStore>,
        dispatcher: Arc<ProviderDispatcher>,
    ) -> Self {
        Self {
            id,
            request,
            store,
            dispatcher,
        }
    }

    /// Drive the task to a terminal state.
    pub async fn run(self) {
        let Self {
            id,
            request,
            store,
            dispatcher,
        } = self;

        let cloud_type = request.normalized_cloud_type();
        let metric_label = dispatcher.metric_label(&cloud_type);
        let guard = TerminalGuard::new(id, metric_label.clone(), store);
        let started = Instant::now();

        tracing::info!(task_id = %id, cloud_type = %cloud_type, "Provisioning started");

        let dispatched = AssertUnwindSafe(dispatcher.dispatch(&request))
            .catch_unwind()
            .await;

        // Credentials go away with the request before the record is touched.
        drop(request);

        let outcome = match dispatched {
            Ok(Ok(address)) => {
                tracing::info!(
                    task_id = %id,
                    cloud_type = %cloud_type,
                    address = %address,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Provisioning finished"
                );
                TaskOutcome::Done(address)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    task_id = %id,
                    cloud_type = %cloud_type,
                    error = %e,
                    "Provisioning failed"
                );
                TaskOutcome::Failed(TaskFailure::from(e))
            }
            Err(panic) => {
                let message = format!("provisioning worker panicked: {}", panic_message(panic.as_ref()));
                tracing::error!(task_id = %id, cloud_type = %cloud_type, "{}", message);
                TaskOutcome::Failed(TaskFailure::message(message))
            }
        };

        metrics::record_provision_duration(&metric_label, started);
        guard.complete(outcome);
    }
}

/// Writes the terminal state exactly once, falling back to `failed` on drop.
struct TerminalGuard {
    id: TaskId,
    /// Bounded label; the raw cloud type only goes to logs.
    metric_label: String,
    store: Arc<TaskStore>,
    armed: bool,
}

impl TerminalGuard {
    fn new(id: TaskId, metric_label: String, store: Arc<TaskStore>) -> Self {
        Self {
            id,
            metric_label,
            store,
            armed: true,
        }
    }

    fn complete(mut self, outcome: TaskOutcome) {
        self.armed = false;
        self.write(outcome);
    }

    fn write(&self, outcome: TaskOutcome) {
        let status = match &outcome {
            TaskOutcome::Done(_) => "done",
            TaskOutcome::Failed(_) => "failed",
        };
        match self.store.set_terminal(&self.id, outcome) {
            Ok(()) => metrics::record_task_finished(&self.metric_label, status),
            Err(e) => tracing::error!(task_id = %self.id, error = %e, "Failed to record task outcome"),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(task_id = %self.id, "Provisioning worker dropped while pending");
            self.write(TaskOutcome::Failed(TaskFailure::message(ABORTED_MESSAGE)));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
