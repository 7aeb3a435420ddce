use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::time::Duration;

use blockchain_forge::provisioning::{Credentials, ProvisionRequest};

#[derive(Parser)]
#[command(name = "forge-cli")]
#[command(about = "Command-line client for the blockchain-forge API", long_about = None)]
struct Cli {
    #[arg(short, long, env = "FORGE_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health and task counts
    Health,
    /// Submit a machine provisioning request
    CreateMachine(CreateMachineArgs),
    /// Show the state of a provisioning task
    TaskStatus {
        id: String,
    },
    /// Manage RPC endpoints
    #[command(subcommand)]
    Rpcs(RpcCommands),
    /// Manage nodes
    #[command(subcommand)]
    Nodes(NodeCommands),
}

#[derive(Args)]
struct CreateMachineArgs {
    #[arg(long)]
    cloud_type: String,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    machine_type: Option<String>,
    #[arg(long)]
    image_name: Option<String>,
    #[arg(long)]
    disk_type: Option<String>,
    #[arg(long)]
    disk_size: Option<String>,
    #[arg(long)]
    machine_name: Option<String>,
    #[arg(long)]
    vpc_name: Option<String>,
    #[arg(long)]
    project: Option<String>,

    #[arg(long, env = "FORGE_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,
    #[arg(long, env = "FORGE_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,
    #[arg(long, env = "FORGE_CLIENT_ID", hide_env_values = true)]
    client_id: Option<String>,
    #[arg(long, env = "FORGE_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,
    #[arg(long, env = "FORGE_TENANT_ID", hide_env_values = true)]
    tenant_id: Option<String>,
    #[arg(long, env = "FORGE_SUBSCRIPTION_ID", hide_env_values = true)]
    subscription_id: Option<String>,

    /// Poll until the task reaches a terminal state
    #[arg(long)]
    wait: bool,

    /// Seconds between polls with --wait
    #[arg(long, default_value_t = 5)]
    interval: u64,
}

impl From<CreateMachineArgs> for ProvisionRequest {
    fn from(args: CreateMachineArgs) -> Self {
        ProvisionRequest {
            cloud_type: args.cloud_type,
            region: args.region,
            machine_type: args.machine_type,
            image_name: args.image_name,
            disk_type: args.disk_type,
            disk_size: args.disk_size,
            machine_name: args.machine_name,
            vpc_name: args.vpc_name,
            project: args.project,
            credentials: Credentials {
                access_key: args.access_key,
                secret_key: args.secret_key,
                client_id: args.client_id,
                client_secret: args.client_secret,
                tenant_id: args.tenant_id,
                subscription_id: args.subscription_id,
            },
        }
    }
}

#[derive(Subcommand)]
enum RpcCommands {
    List,
    Add {
        #[arg(long)]
        url: String,
        #[arg(long)]
        chain_id: u64,
        #[arg(long, default_value = "active")]
        status: String,
    },
    Delete {
        id: u64,
    },
}

#[derive(Subcommand)]
enum NodeCommands {
    List,
    Add {
        #[arg(long)]
        chain: String,
        #[arg(long, default_value = "active")]
        status: String,
        #[arg(long, default_value = "unknown")]
        sync_status: String,
    },
    Delete {
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/api", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", api)).send().await?;
            print_response(res).await?;
        }
        Commands::CreateMachine(args) => {
            let wait = args.wait;
            let interval = Duration::from_secs(args.interval.max(1));
            let request = ProvisionRequest::from(args);

            let res = client
                .post(format!("{}/create-machine", api))
                .json(&request)
                .send()
                .await?;
            let Some(body) = print_response(res).await? else {
                return Ok(());
            };

            if wait {
                let id = body["taskId"].as_str().ok_or("response carried no taskId")?;
                wait_for_task(&client, &api, id, interval).await?;
            }
        }
        Commands::TaskStatus { id } => {
            let res = client
                .get(format!("{}/task-status", api))
                .query(&[("id", id)])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Rpcs(RpcCommands::List) => {
            let res = client.get(format!("{}/rpcs", api)).send().await?;
            print_response(res).await?;
        }
        Commands::Rpcs(RpcCommands::Add { url, chain_id, status }) => {
            let res = client
                .post(format!("{}/rpcs", api))
                .json(&json!({ "url": url, "chain_id": chain_id, "status": status }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Rpcs(RpcCommands::Delete { id }) => {
            let res = client.delete(format!("{}/rpcs/{}", api, id)).send().await?;
            print_response(res).await?;
        }
        Commands::Nodes(NodeCommands::List) => {
            let res = client.get(format!("{}/nodes", api)).send().await?;
            print_response(res).await?;
        }
        Commands::Nodes(NodeCommands::Add { chain, status, sync_status }) => {
            let res = client
                .post(format!("{}/nodes", api))
                .json(&json!({ "chain": chain, "status": status, "sync_status": sync_status }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Nodes(NodeCommands::Delete { id }) => {
            let res = client.delete(format!("{}/nodes/{}", api, id)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn wait_for_task(
    client: &reqwest::Client,
    api: &str,
    id: &str,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        tokio::time::sleep(interval).await;
        let res = client
            .get(format!("{}/task-status", api))
            .query(&[("id", id)])
            .send()
            .await?;
        let status = res.status();
        let task: Value = res.json().await?;
        if !status.is_success() {
            eprintln!("Error: API returned status {}", status);
            eprintln!("Response: {}", task);
            return Ok(());
        }

        match task["status"].as_str() {
            Some("pending") => eprintln!("task {} pending...", id),
            _ => {
                println!("{}", serde_json::to_string_pretty(&task)?);
                return Ok(());
            }
        }
    }
}

/// Print a JSON body, or the error returned by the API. Yields the body on success.
async fn print_response(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(None);
    }

    let text = res.text().await?;
    if text.is_empty() {
        println!("{}", status);
        return Ok(Some(Value::Null));
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(Some(json))
}
