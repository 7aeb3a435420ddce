//! Amazon EC2 driver (`aws`).

use async_trait::async_trait;

use crate::config::AwsDriverConfig;
use crate::provisioning::driver::{required, ProviderDriver, ProviderError, ProvisionStep};
use crate::provisioning::drivers::cli::{parse_json, string_at, CliCommand};
use crate::provisioning::drivers::disk_size_gb;
use crate::provisioning::request::ProvisionRequest;

pub struct AwsDriver {
    binary: String,
    root_device: String,
}

impl AwsDriver {
    pub fn new(config: &AwsDriverConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            root_device: config.root_device.clone(),
        }
    }

    fn run_instances_args(&self, request: &ProvisionRequest) -> Result<Vec<String>, ProviderError> {
        let image = required(&request.image_name, "imageName")?;
        let instance_type = required(&request.machine_type, "machineType")?;
        let name = required(&request.machine_name, "machineName")?;

        let mut args: Vec<String> = vec![
            "ec2".into(),
            "run-instances".into(),
            "--image-id".into(),
            image.into(),
            "--instance-type".into(),
            instance_type.into(),
            "--count".into(),
            "1".into(),
            "--tag-specifications".into(),
            format!("ResourceType=instance,Tags=[{{Key=Name,Value={}}}]", name),
            "--output".into(),
            "json".into(),
        ];

        if let Some(size) = disk_size_gb(request)? {
            let volume_type = request
                .disk_type
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or("gp3");
            args.push("--block-device-mappings".into());
            args.push(format!(
                "DeviceName={},Ebs={{VolumeSize={},VolumeType={}}}",
                self.root_device, size, volume_type
            ));
        }
        if let Some(subnet) = request.vpc_name.as_deref().filter(|v| !v.is_empty()) {
            args.push("--subnet-id".into());
            args.push(subnet.into());
        }

        Ok(args)
    }
}

#[async_trait]
impl ProviderDriver for AwsDriver {
    fn cloud_type(&self) -> &str {
        "aws"
    }

    async fn create(&self, request: &ProvisionRequest) -> Result<String, ProviderError> {
        let region = required(&request.region, "region")?;
        let args = self.run_instances_args(request)?;

        let credentials = &request.credentials;
        let cli = CliCommand::new(&self.binary)
            .env("AWS_DEFAULT_REGION", region)
            .env_opt("AWS_ACCESS_KEY_ID", credentials.access_key.as_deref())
            .env_opt("AWS_SECRET_ACCESS_KEY", credentials.secret_key.as_deref());

        let launched = cli.run(ProvisionStep::Apply, &args).await?;
        let launched = parse_json(ProvisionStep::Apply, &launched)?;
        let instance_id = launched
            .pointer("/Instances/0/InstanceId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::new(ProvisionStep::Apply, "run-instances returned no instance id"))?
            .to_string();

        tracing::debug!(instance_id = %instance_id, "EC2 instance launched, waiting for running state");

        cli.run(
            ProvisionStep::AwaitReachable,
            ["ec2", "wait", "instance-running", "--instance-ids", instance_id.as_str()],
        )
        .await?;

        let described = cli
            .run(
                ProvisionStep::ExtractAddress,
                [
                    "ec2",
                    "describe-instances",
                    "--instance-ids",
                    instance_id.as_str(),
                    "--output",
                    "json",
                ],
            )
            .await?;
        let described = parse_json(ProvisionStep::ExtractAddress, &described)?;
        string_at(&described, "/Reservations/0/Instances/0/PublicIpAddress", "public IP")
    }
}
