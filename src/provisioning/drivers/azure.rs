//! Azure virtual machine driver (`az`).
//!
//! Each task gets its own `AZURE_CONFIG_DIR`, so service principal logins of
//! concurrent tasks never share a token cache.

use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::config::AzureDriverConfig;
use crate::provisioning::driver::{required, ProviderDriver, ProviderError, ProvisionStep};
use crate::provisioning::drivers::cli::{parse_json, string_at, CliCommand};
use crate::provisioning::drivers::disk_size_gb;
use crate::provisioning::request::ProvisionRequest;

/// Client secret file inside the per-task config dir, passed to `az` as `@path`.
const SECRET_FILE: &str = "sp-secret";

pub struct AzureDriver {
    binary: String,
    admin_username: String,
}

impl AzureDriver {
    pub fn new(config: &AzureDriverConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            admin_username: config.admin_username.clone(),
        }
    }

    /// `az login` arguments; the client secret is read by `az` from `secret_file`.
    fn login_args(request: &ProvisionRequest, secret_file: &Path) -> Result<Vec<String>, ProviderError> {
        let credentials = &request.credentials;
        let client_id = principal_field(&credentials.client_id, "clientId")?;
        principal_field(&credentials.client_secret, "clientSecret")?;
        let tenant = principal_field(&credentials.tenant_id, "tenantId")?;

        Ok(vec![
            "login".into(),
            "--service-principal".into(),
            "--username".into(),
            client_id.into(),
            "--password".into(),
            format!("@{}", secret_file.display()),
            "--tenant".into(),
            tenant.into(),
            "--output".into(),
            "none".into(),
        ])
    }

    fn vm_create_args(&self, request: &ProvisionRequest) -> Result<Vec<String>, ProviderError> {
        let resource_group = required(&request.vpc_name, "vpcName")?;
        let name = required(&request.machine_name, "machineName")?;
        let location = required(&request.region, "region")?;
        let size = required(&request.machine_type, "machineType")?;
        let image = request
            .image_name
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("Ubuntu2204");

        let mut args: Vec<String> = vec![
            "vm".into(),
            "create".into(),
            "--resource-group".into(),
            resource_group.into(),
            "--name".into(),
            name.into(),
            "--location".into(),
            location.into(),
            "--size".into(),
            size.into(),
            "--image".into(),
            image.into(),
            "--admin-username".into(),
            self.admin_username.clone(),
            "--generate-ssh-keys".into(),
            "--public-ip-sku".into(),
            "Standard".into(),
            "--output".into(),
            "json".into(),
        ];

        if let Some(sku) = request.disk_type.as_deref().filter(|v| !v.is_empty()) {
            args.push("--storage-sku".into());
            args.push(sku.into());
        }
        if let Some(size) = disk_size_gb(request)? {
            args.push("--os-disk-size-gb".into());
            args.push(size.to_string());
        }
        if let Some(subscription) = request.credentials.subscription_id.as_deref().filter(|v| !v.is_empty()) {
            args.push("--subscription".into());
            args.push(subscription.into());
        }

        Ok(args)
    }

    async fn provision(&self, cli: &CliCommand, config_dir: &Path, request: &ProvisionRequest) -> Result<String, ProviderError> {
        let secret_file = config_dir.join(SECRET_FILE);
        let login = Self::login_args(request, &secret_file)?;
        let create = self.vm_create_args(request)?;

        let secret = principal_field(&request.credentials.client_secret, "clientSecret")?;
        write_secret(&secret_file, secret).await?;
        let logged_in = cli.run(ProvisionStep::Authenticate, &login).await;
        if let Err(e) = tokio::fs::remove_file(&secret_file).await {
            tracing::warn!(error = %e, "Failed to remove Azure client secret file");
        }
        logged_in?;

        let output = cli.run(ProvisionStep::Apply, &create).await?;
        let created = parse_json(ProvisionStep::ExtractAddress, &output)?;
        string_at(&created, "/publicIpAddress", "public IP address")
    }
}

fn principal_field<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ProviderError> {
    value.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| {
        ProviderError::new(
            ProvisionStep::Authenticate,
            format!("missing service principal field '{}'", field),
        )
    })
}

/// Write the client secret to a fresh owner-only file.
async fn write_secret(path: &Path, secret: &str) -> Result<(), ProviderError> {
    let failed = |e: std::io::Error| {
        ProviderError::new(ProvisionStep::Authenticate, format!("failed to stage client secret: {}", e))
    };

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await.map_err(failed)?;
    file.write_all(secret.as_bytes()).await.map_err(failed)?;
    file.flush().await.map_err(failed)
}

#[async_trait]
impl ProviderDriver for AzureDriver {
    fn cloud_type(&self) -> &str {
        "azure"
    }

    async fn create(&self, request: &ProvisionRequest) -> Result<String, ProviderError> {
        // Owner-only directory, removed when dropped, including on abort.
        let config_dir = tempfile::Builder::new()
            .prefix("blockchain-forge-az-")
            .tempdir()
            .map_err(|e| {
                ProviderError::new(
                    ProvisionStep::Authenticate,
                    format!("failed to create Azure CLI config dir: {}", e),
                )
            })?;
        let cli = CliCommand::new(&self.binary)
            .env("AZURE_CONFIG_DIR", &config_dir.path().to_string_lossy());

        let result = self.provision(&cli, config_dir.path(), request).await;

        if let Err(e) = config_dir.close() {
            tracing::warn!(error = %e, "Failed to remove Azure CLI config dir");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioning::request::Credentials;

    fn driver() -> AzureDriver {
        AzureDriver::new(&AzureDriverConfig::default())
    }

    fn request() -> ProvisionRequest {
        ProvisionRequest {
            cloud_type: "azure".into(),
            region: Some("westeurope".into()),
            machine_type: Some("Standard_B1s".into()),
            machine_name: Some("node-1".into()),
            vpc_name: Some("forge-rg".into()),
            disk_type: Some("Premium_LRS".into()),
            disk_size: Some("64".into()),
            credentials: Credentials {
                client_id: Some("cid".into()),
                client_secret: Some("secret".into()),
                tenant_id: Some("tid".into()),
                subscription_id: Some("sub".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_vm_create_args() {
        let args = driver().vm_create_args(&request()).unwrap();
        let joined = args.join(" ");
        assert!(joined.starts_with("vm create --resource-group forge-rg --name node-1"));
        assert!(joined.contains("--image Ubuntu2204"));
        assert!(joined.contains("--admin-username adminuser"));
        assert!(joined.contains("--storage-sku Premium_LRS"));
        assert!(joined.contains("--os-disk-size-gb 64"));
        assert!(joined.contains("--subscription sub"));
    }

    #[test]
    fn test_login_requires_service_principal() {
        let mut request = request();
        request.credentials.tenant_id = None;
        let err = AzureDriver::login_args(&request, Path::new("/tmp/forge/sp-secret")).unwrap_err();
        assert_eq!(err.step, ProvisionStep::Authenticate);
        assert!(err.message.contains("tenantId"));
    }

    #[test]
    fn test_client_secret_stays_out_of_argv() {
        let mut request = request();
        request.credentials.client_secret = Some("TOP-SECRET".into());
        let secret_file = Path::new("/tmp/forge/sp-secret");

        let login = AzureDriver::login_args(&request, secret_file).unwrap();
        let create = driver().vm_create_args(&request).unwrap();
        for arg in login.iter().chain(create.iter()) {
            assert!(!arg.contains("TOP-SECRET"), "secret leaked in argument {arg:?}");
        }

        let password = login.iter().position(|a| a == "--password").unwrap();
        assert_eq!(login[password + 1], "@/tmp/forge/sp-secret");
    }

    #[tokio::test]
    async fn test_secret_file_is_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SECRET_FILE);

        write_secret(&path, "TOP-SECRET").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "TOP-SECRET");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        // create_new refuses to reuse a staged file
        assert!(write_secret(&path, "other").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_resource_group_is_define_error() {
        let mut request = request();
        request.vpc_name = None;
        let err = driver().create(&request).await.unwrap_err();
        assert_eq!(err.step, ProvisionStep::Define);
        assert!(err.message.contains("vpcName"));
    }
}
