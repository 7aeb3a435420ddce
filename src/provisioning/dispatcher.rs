//! Cloud-type to driver dispatch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::provisioning::driver::{ProviderDriver, ProviderError};
use crate::provisioning::request::{normalize_cloud_type, ProvisionRequest};
use crate::provisioning::task::TaskFailure;

/// Label shared by every cloud type without a registered driver.
pub const UNSUPPORTED_LABEL: &str = "unsupported";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported cloud type: '{0}'")]
    UnsupportedCloudType(String),

    #[error("{provider} driver failed during {step}: {source}", step = .source.step)]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },
}

impl From<DispatchError> for TaskFailure {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Provider { provider, source } => TaskFailure {
                error: source.message,
                provider: Some(provider),
                step: Some(source.step),
            },
            other => TaskFailure::message(other.to_string()),
        }
    }
}

/// Registry of provider drivers keyed by cloud type.
#[derive(Default, Clone)]
pub struct ProviderDispatcher {
    drivers: HashMap<String, Arc<dyn ProviderDriver>>,
}

impl ProviderDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its cloud type, replacing any previous one.
    pub fn register(&mut self, driver: Arc<dyn ProviderDriver>) -> &mut Self {
        let key = normalize_cloud_type(driver.cloud_type());
        if self.drivers.insert(key.clone(), driver).is_some() {
            tracing::warn!(cloud_type = %key, "Replacing previously registered driver");
        }
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn ProviderDriver>) -> Self {
        self.register(driver);
        self
    }

    /// Look up the driver for a cloud type.
    pub fn resolve(&self, cloud_type: &str) -> Result<Arc<dyn ProviderDriver>, DispatchError> {
        let key = normalize_cloud_type(cloud_type);
        self.drivers
            .get(&key)
            .cloned()
            .ok_or_else(|| DispatchError::UnsupportedCloudType(cloud_type.trim().to_string()))
    }

    /// Metric label for a cloud type: the registry key, or `unsupported`.
    pub fn metric_label(&self, cloud_type: &str) -> String {
        let key = normalize_cloud_type(cloud_type);
        if self.drivers.contains_key(&key) {
            key
        } else {
            UNSUPPORTED_LABEL.to_string()
        }
    }

    /// Registered cloud types, sorted.
    pub fn cloud_types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.drivers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Route a request to its driver and run the creation flow once.
    pub async fn dispatch(&self, request: &ProvisionRequest) -> Result<String, DispatchError> {
        let driver = self.resolve(&request.cloud_type)?;
        let provider = driver.cloud_type().to_string();

        tracing::debug!(provider = %provider, "Dispatching provisioning request");

        driver
            .create(request)
            .await
            .map_err(|source| DispatchError::Provider { provider, source })
    }
}

impl fmt::Debug for ProviderDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDispatcher")
            .field("cloud_types", &self.cloud_types())
            .finish()
    }
}
