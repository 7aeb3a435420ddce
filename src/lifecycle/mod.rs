//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Init logging/metrics → Build drivers → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C / SIGTERM / trigger → Stop accepting → Drain workers → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has a deadline: workers still running after the drain
//!   timeout are aborted and their tasks marked failed

pub mod shutdown;

pub use shutdown::{wait_for_shutdown, Shutdown};
