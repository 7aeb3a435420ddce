//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → ForgeConfig (validated, immutable)
//!     → handed to server, logging, metrics and drivers at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AwsDriverConfig, AzureDriverConfig, ForgeConfig, GcpDriverConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ProvidersConfig,
};
