//! Asynchronous machine provisioning subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/create-machine
//!     → provisioner.rs (validate, create pending task, spawn worker)
//!     → returns task id immediately
//!
//! worker.rs (one tokio task per request)
//!     → dispatcher.rs (cloud type → driver registry)
//!     → drivers/* (provider CLI)
//!     → task.rs (single terminal write: done | failed)
//!
//! GET /api/task-status?id=...
//!     → provisioner.rs → task.rs snapshot
//! ```
//!
//! # Known Limitations
//! - Tasks are in memory only and never evicted
//! - Workers are unbounded; a burst of submissions spawns a burst of workers
//! - A driver call that never returns leaves its task pending

pub mod dispatcher;
pub mod driver;
pub mod drivers;
pub mod provisioner;
pub mod request;
pub mod task;
pub mod worker;

pub use dispatcher::{DispatchError, ProviderDispatcher};
pub use driver::{ProviderDriver, ProviderError, ProvisionStep};
pub use provisioner::{PollError, Provisioner, SubmitError};
pub use request::{Credentials, ProvisionRequest};
pub use task::{Task, TaskError, TaskId, TaskOutcome, TaskState, TaskStore};
pub use worker::ProvisionWorker;
