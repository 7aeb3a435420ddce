//! RPC endpoint and node records.
//!
//! Plain CRUD behind the `RecordStore` trait; nothing here touches the
//! provisioning task engine. The shipped store is in-memory.

pub mod model;
pub mod store;

pub use model::{NewNode, NewRpc, Node, Rpc};
pub use store::{MemoryRecordStore, RecordError, RecordResult, RecordStore};
