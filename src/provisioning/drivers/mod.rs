//! Shipped provider drivers.
//!
//! # Data Flow
//! ```text
//! ProvisionRequest
//!     → gcp.rs / aws.rs / azure.rs (build provider CLI invocations)
//!     → cli.rs (spawn CLI, credentials via child environment)
//!     → JSON/text output → public address
//! ```
//!
//! # Design Decisions
//! - Drivers shell out to the official provider CLIs instead of linking SDKs
//! - Credentials never appear in logs; they are set on the child process only
//! - Which drivers are registered is decided by `ProvidersConfig`

pub mod aws;
pub mod azure;
pub mod cli;
pub mod gcp;

use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::provisioning::dispatcher::ProviderDispatcher;
use crate::provisioning::driver::{ProviderError, ProvisionStep};
use crate::provisioning::request::ProvisionRequest;

pub use aws::AwsDriver;
pub use azure::AzureDriver;
pub use gcp::GcpDriver;

/// Build a dispatcher holding every driver enabled in the configuration.
pub fn dispatcher_from_config(config: &ProvidersConfig) -> ProviderDispatcher {
    let mut dispatcher = ProviderDispatcher::new();

    if config.gcp.enabled {
        dispatcher.register(Arc::new(GcpDriver::new(&config.gcp)));
    }
    if config.aws.enabled {
        dispatcher.register(Arc::new(AwsDriver::new(&config.aws)));
    }
    if config.azure.enabled {
        dispatcher.register(Arc::new(AzureDriver::new(&config.azure)));
    }

    tracing::info!(cloud_types = ?dispatcher.cloud_types(), "Provider drivers registered");
    dispatcher
}

/// Disk size in GB, if the request carries one.
pub(crate) fn disk_size_gb(request: &ProvisionRequest) -> Result<Option<u32>, ProviderError> {
    match request.disk_size.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ProviderError::new(ProvisionStep::Define, format!("invalid diskSize '{}'", raw))),
    }
}
