//! RPC endpoint and node records.

use serde::{Deserialize, Serialize};

/// A blockchain RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rpc {
    pub id: u64,
    pub url: String,
    pub chain_id: u64,
    pub status: String,
}

/// A blockchain node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub chain: String,
    pub status: String,
    pub sync_status: String,
}

/// Body of `POST /api/rpcs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRpc {
    pub url: String,
    pub chain_id: u64,
    #[serde(default = "default_rpc_status")]
    pub status: String,
}

/// Body of `POST /api/nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNode {
    pub chain: String,
    #[serde(default = "default_node_status")]
    pub status: String,
    #[serde(default = "default_sync_status")]
    pub sync_status: String,
}

fn default_rpc_status() -> String {
    "active".to_string()
}

fn default_node_status() -> String {
    "active".to_string()
}

fn default_sync_status() -> String {
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_records_defaults() {
        let rpc: NewRpc = serde_json::from_str(r#"{"url":"https://rpc.example","chain_id":1}"#).unwrap();
        assert_eq!(rpc.status, "active");

        let node: NewNode = serde_json::from_str(r#"{"chain":"ethereum"}"#).unwrap();
        assert_eq!(node.status, "active");
        assert_eq!(node.sync_status, "unknown");
    }

    #[test]
    fn test_snake_case_fields() {
        let node = Node {
            id: 7,
            chain: "solana".into(),
            status: "active".into(),
            sync_status: "synced".into(),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["sync_status"], "synced");
    }
}
