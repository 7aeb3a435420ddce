//! Google Compute Engine driver (`gcloud`).

use async_trait::async_trait;

use crate::config::GcpDriverConfig;
use crate::provisioning::driver::{required, ProviderDriver, ProviderError, ProvisionStep};
use crate::provisioning::drivers::cli::{parse_json, string_at, CliCommand};
use crate::provisioning::drivers::disk_size_gb;
use crate::provisioning::request::ProvisionRequest;

const NAT_IP_POINTER: &str = "/0/networkInterfaces/0/accessConfigs/0/natIP";

pub struct GcpDriver {
    binary: String,
    credentials_file: Option<String>,
}

impl GcpDriver {
    pub fn new(config: &GcpDriverConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            credentials_file: config.credentials_file.clone(),
        }
    }

    fn create_args(request: &ProvisionRequest) -> Result<Vec<String>, ProviderError> {
        let name = required(&request.machine_name, "machineName")?;
        let zone = required(&request.region, "region")?;
        let machine_type = required(&request.machine_type, "machineType")?;
        let image = required(&request.image_name, "imageName")?;
        let network = request
            .vpc_name
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("default");

        let mut args: Vec<String> = vec![
            "compute".into(),
            "instances".into(),
            "create".into(),
            name.into(),
            format!("--zone={}", zone),
            format!("--machine-type={}", machine_type),
            format!("--image={}", image),
            format!("--network={}", network),
            "--format=json".into(),
            "--quiet".into(),
        ];

        if let Some(disk_type) = request.disk_type.as_deref().filter(|v| !v.is_empty()) {
            args.push(format!("--boot-disk-type={}", disk_type));
        }
        if let Some(size) = disk_size_gb(request)? {
            args.push(format!("--boot-disk-size={}GB", size));
        }
        if let Some(project) = request.project.as_deref().filter(|v| !v.is_empty()) {
            args.push(format!("--project={}", project));
        }

        Ok(args)
    }
}

#[async_trait]
impl ProviderDriver for GcpDriver {
    fn cloud_type(&self) -> &str {
        "gcp"
    }

    async fn create(&self, request: &ProvisionRequest) -> Result<String, ProviderError> {
        let args = Self::create_args(request)?;
        let cli = CliCommand::new(&self.binary)
            .env_opt("CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE", self.credentials_file.as_deref());

        let output = cli.run(ProvisionStep::Apply, &args).await?;
        let created = parse_json(ProvisionStep::ExtractAddress, &output)?;
        string_at(&created, NAT_IP_POINTER, "NAT IP")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProvisionRequest {
        ProvisionRequest {
            cloud_type: "gcp".into(),
            region: Some("us-central1-a".into()),
            machine_type: Some("e2-medium".into()),
            image_name: Some("projects/debian-cloud/global/images/family/debian-12".into()),
            machine_name: Some("node-1".into()),
            disk_size: Some("20".into()),
            project: Some("forge".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_args() {
        let args = GcpDriver::create_args(&request()).unwrap();
        assert_eq!(&args[..4], ["compute", "instances", "create", "node-1"]);
        assert!(args.contains(&"--zone=us-central1-a".to_string()));
        assert!(args.contains(&"--network=default".to_string()));
        assert!(args.contains(&"--boot-disk-size=20GB".to_string()));
        assert!(args.contains(&"--project=forge".to_string()));
    }

    #[test]
    fn test_missing_machine_name() {
        let mut request = request();
        request.machine_name = None;
        let err = GcpDriver::create_args(&request).unwrap_err();
        assert_eq!(err.step, ProvisionStep::Define);
        assert!(err.message.contains("machineName"));
    }

    #[test]
    fn test_nat_ip_extraction() {
        let output = r#"[{"name":"node-1","networkInterfaces":[{"accessConfigs":[{"natIP":"34.1.2.3"}]}]}]"#;
        let value = parse_json(ProvisionStep::ExtractAddress, output).unwrap();
        assert_eq!(string_at(&value, NAT_IP_POINTER, "NAT IP").unwrap(), "34.1.2.3");

        let value = parse_json(ProvisionStep::ExtractAddress, r#"[{"networkInterfaces":[{}]}]"#).unwrap();
        let err = string_at(&value, NAT_IP_POINTER, "NAT IP").unwrap_err();
        assert_eq!(err.message, "failed to get NAT IP");
    }
}
