//! Shared utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use blockchain_forge::config::ForgeConfig;
use blockchain_forge::http::HttpServer;
use blockchain_forge::lifecycle::Shutdown;
use blockchain_forge::provisioning::{
    ProviderDispatcher, ProviderDriver, ProviderError, ProvisionRequest, ProvisionStep, Provisioner,
};
use blockchain_forge::records::MemoryRecordStore;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What a stub driver does when invoked.
#[derive(Clone)]
pub enum StubBehavior {
    Address(String),
    /// Report the request's `machineName` as the address.
    EchoMachineName,
    Error(String),
    Panic,
}

/// Programmable driver that counts its invocations.
pub struct StubDriver {
    cloud_type: String,
    delay: Duration,
    behavior: StubBehavior,
    calls: AtomicUsize,
}

impl StubDriver {
    pub fn new(cloud_type: &str, behavior: StubBehavior) -> Arc<Self> {
        Self::delayed(cloud_type, behavior, Duration::ZERO)
    }

    pub fn delayed(cloud_type: &str, behavior: StubBehavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            cloud_type: cloud_type.to_string(),
            delay,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderDriver for StubDriver {
    fn cloud_type(&self) -> &str {
        &self.cloud_type
    }

    async fn create(&self, request: &ProvisionRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            StubBehavior::Address(addr) => Ok(addr.clone()),
            StubBehavior::EchoMachineName => Ok(request.machine_name.clone().unwrap_or_default()),
            StubBehavior::Error(msg) => Err(ProviderError::new(ProvisionStep::Apply, msg.clone())),
            StubBehavior::Panic => panic!("stub driver exploded"),
        }
    }
}

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    /// Shared with the running server; stays readable after `stop`.
    pub provisioner: Arc<Provisioner>,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server, including the worker drain.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(10), self.handle).await;
    }
}

pub async fn start_server(dispatcher: ProviderDispatcher) -> TestServer {
    start_server_with_config(ForgeConfig::default(), dispatcher).await
}

pub async fn start_server_with_config(mut config: ForgeConfig, dispatcher: ProviderDispatcher) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let server = HttpServer::new(config, dispatcher, Arc::new(MemoryRecordStore::new()));
    let provisioner = server.state().provisioner.clone();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, rx).await });

    TestServer { addr, shutdown, provisioner, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Poll a task until it leaves `pending`.
pub async fn wait_terminal(client: &reqwest::Client, server: &TestServer, task_id: &str) -> Value {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let task: Value = client
            .get(server.url("/api/task-status"))
            .query(&[("id", task_id)])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if task["status"] != "pending" {
            return task;
        }
        assert!(Instant::now() < deadline, "task {} stuck in pending", task_id);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
