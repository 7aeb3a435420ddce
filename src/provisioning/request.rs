//! Machine provisioning request payload.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body of `POST /api/create-machine`.
///
/// Everything except `cloud_type` is interpreted by the selected driver only.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvisionRequest {
    /// Driver discriminator (`gcp`, `aws`, `azure`, ...).
    pub cloud_type: String,
    pub region: Option<String>,
    pub machine_type: Option<String>,
    pub image_name: Option<String>,
    pub disk_type: Option<String>,
    pub disk_size: Option<String>,
    pub machine_name: Option<String>,
    pub vpc_name: Option<String>,
    pub project: Option<String>,

    /// Provider credentials, handed to the driver and nowhere else.
    #[serde(flatten)]
    pub credentials: Credentials,
}

/// Credential material carried by a request.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub subscription_id: Option<String>,
}

impl ProvisionRequest {
    /// Cloud type as used for registry lookups.
    pub fn normalized_cloud_type(&self) -> String {
        normalize_cloud_type(&self.cloud_type)
    }
}

pub(crate) fn normalize_cloud_type(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

impl fmt::Debug for ProvisionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionRequest")
            .field("cloud_type", &self.cloud_type)
            .field("region", &self.region)
            .field("machine_type", &self.machine_type)
            .field("image_name", &self.image_name)
            .field("disk_type", &self.disk_type)
            .field("disk_size", &self.disk_size)
            .field("machine_name", &self.machine_name)
            .field("vpc_name", &self.vpc_name)
            .field("project", &self.project)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(value: &Option<String>) -> &'static str {
            if value.is_some() { "<redacted>" } else { "<unset>" }
        }

        f.debug_struct("Credentials")
            .field("access_key", &mask(&self.access_key))
            .field("secret_key", &mask(&self.secret_key))
            .field("client_id", &mask(&self.client_id))
            .field("client_secret", &mask(&self.client_secret))
            .field("tenant_id", &mask(&self.tenant_id))
            .field("subscription_id", &mask(&self.subscription_id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_payload() {
        let json = r#"{
            "cloudType": "aws",
            "region": "us-east-1",
            "machineType": "t3.micro",
            "imageName": "ami-123",
            "machineName": "x",
            "accessKey": "AKIA",
            "secretKey": "s3cr3t"
        }"#;
        let request: ProvisionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.cloud_type, "aws");
        assert_eq!(request.machine_type.as_deref(), Some("t3.micro"));
        assert_eq!(request.credentials.access_key.as_deref(), Some("AKIA"));
        assert!(request.credentials.tenant_id.is_none());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let request = ProvisionRequest {
            cloud_type: "azure".into(),
            credentials: Credentials {
                client_secret: Some("very-secret-value".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let rendered = format!("{:?}", request);
        assert!(!rendered.contains("very-secret-value"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("azure"));
    }

    #[test]
    fn test_cloud_type_normalization() {
        let request = ProvisionRequest {
            cloud_type: "  GCP ".into(),
            ..Default::default()
        };
        assert_eq!(request.normalized_cloud_type(), "gcp");
    }
}
