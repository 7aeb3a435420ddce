//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned and echoed)
//!     → machine.rs / records.rs (handlers)
//!     → response.rs (errors rendered as {"error": ...})
//!     → Send to client
//! ```

pub mod machine;
pub mod records;
pub mod request;
pub mod response;
pub mod server;

pub use request::{CurrentRequestId, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
