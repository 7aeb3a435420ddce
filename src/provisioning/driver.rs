//! Provider driver capability.
//!
//! A driver owns the whole creation flow for one cloud: authentication,
//! resource definition, apply, waiting for reachability and reading back the
//! public address. The task engine only sees `create` and its result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::provisioning::request::ProvisionRequest;

/// Step of the creation flow a driver failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStep {
    Authenticate,
    Define,
    Apply,
    AwaitReachable,
    ExtractAddress,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionStep::Authenticate => "authenticate",
            ProvisionStep::Define => "define",
            ProvisionStep::Apply => "apply",
            ProvisionStep::AwaitReachable => "await_reachable",
            ProvisionStep::ExtractAddress => "extract_address",
        };
        f.write_str(name)
    }
}

/// Failure reported by a driver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub step: ProvisionStep,
    pub message: String,
}

impl ProviderError {
    pub fn new(step: ProvisionStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

/// Cloud-specific machine creation.
#[async_trait]
pub trait ProviderDriver: Send + Sync {
    /// Registry key, lowercase (e.g. "gcp").
    fn cloud_type(&self) -> &str;

    /// Create a machine and return its public address.
    async fn create(&self, request: &ProvisionRequest) -> Result<String, ProviderError>;
}

/// Fetch a request field the driver cannot work without.
pub fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ProviderError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ProviderError::new(
            ProvisionStep::Define,
            format!("missing required field '{}'", field),
        )),
    }
}
