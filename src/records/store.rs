//! Record storage.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use url::Url;

use crate::records::model::{NewNode, NewRpc, Node, Rpc};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

pub type RecordResult<T> = Result<T, RecordError>;

/// CRUD over RPC endpoints and nodes.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_rpcs(&self) -> RecordResult<Vec<Rpc>>;
    async fn create_rpc(&self, rpc: NewRpc) -> RecordResult<Rpc>;
    async fn delete_rpc(&self, id: u64) -> RecordResult<()>;

    async fn list_nodes(&self) -> RecordResult<Vec<Node>>;
    async fn create_node(&self, node: NewNode) -> RecordResult<Node>;
    async fn delete_node(&self, id: u64) -> RecordResult<()>;
}

/// Validate an RPC endpoint before it is stored.
pub fn validate_rpc(rpc: &NewRpc) -> RecordResult<()> {
    let url = Url::parse(rpc.url.trim()).map_err(|e| RecordError::Invalid {
        field: "url",
        message: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
        return Err(RecordError::Invalid {
            field: "url",
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(())
}

/// Validate a node before it is stored.
pub fn validate_node(node: &NewNode) -> RecordResult<()> {
    if node.chain.trim().is_empty() {
        return Err(RecordError::Invalid {
            field: "chain",
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// In-process store; contents are lost on restart.
#[derive(Debug)]
pub struct MemoryRecordStore {
    rpcs: DashMap<u64, Rpc>,
    nodes: DashMap<u64, Node>,
    next_rpc_id: AtomicU64,
    next_node_id: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            rpcs: DashMap::new(),
            nodes: DashMap::new(),
            next_rpc_id: AtomicU64::new(1),
            next_node_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn list_rpcs(&self) -> RecordResult<Vec<Rpc>> {
        let mut rpcs: Vec<Rpc> = self.rpcs.iter().map(|r| r.value().clone()).collect();
        rpcs.sort_by_key(|r| r.id);
        Ok(rpcs)
    }

    async fn create_rpc(&self, rpc: NewRpc) -> RecordResult<Rpc> {
        validate_rpc(&rpc)?;
        let id = self.next_rpc_id.fetch_add(1, Ordering::Relaxed);
        let record = Rpc {
            id,
            url: rpc.url.trim().to_string(),
            chain_id: rpc.chain_id,
            status: rpc.status,
        };
        self.rpcs.insert(id, record.clone());
        tracing::info!(rpc_id = id, url = %record.url, chain_id = record.chain_id, "RPC endpoint created");
        Ok(record)
    }

    async fn delete_rpc(&self, id: u64) -> RecordResult<()> {
        self.rpcs
            .remove(&id)
            .map(|_| tracing::info!(rpc_id = id, "RPC endpoint deleted"))
            .ok_or(RecordError::NotFound { kind: "rpc", id })
    }

    async fn list_nodes(&self) -> RecordResult<Vec<Node>> {
        let mut nodes: Vec<Node> = self.nodes.iter().map(|r| r.value().clone()).collect();
        nodes.sort_by_key(|n| n.id);
        Ok(nodes)
    }

    async fn create_node(&self, node: NewNode) -> RecordResult<Node> {
        validate_node(&node)?;
        let id = self.next_node_id.fetch_add(1, Ordering::Relaxed);
        let record = Node {
            id,
            chain: node.chain.trim().to_string(),
            status: node.status,
            sync_status: node.sync_status,
        };
        self.nodes.insert(id, record.clone());
        tracing::info!(node_id = id, chain = %record.chain, "Node created");
        Ok(record)
    }

    async fn delete_node(&self, id: u64) -> RecordResult<()> {
        self.nodes
            .remove(&id)
            .map(|_| tracing::info!(node_id = id, "Node deleted"))
            .ok_or(RecordError::NotFound { kind: "node", id })
    }
}
