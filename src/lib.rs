//! Blockchain node provisioning service library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod provisioning;
pub mod records;

pub use config::ForgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use provisioning::{ProviderDispatcher, ProviderDriver, Provisioner};
pub use records::{MemoryRecordStore, RecordStore};
