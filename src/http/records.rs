//! RPC endpoint and node CRUD endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::records::{NewNode, NewRpc, Node, Rpc};

pub async fn list_rpcs(State(state): State<AppState>) -> Result<Json<Vec<Rpc>>, ApiError> {
    Ok(Json(state.records.list_rpcs().await?))
}

pub async fn create_rpc(
    State(state): State<AppState>,
    payload: Result<Json<NewRpc>, JsonRejection>,
) -> Result<(StatusCode, Json<Rpc>), ApiError> {
    let Json(rpc) = payload?;
    let created = state.records.create_rpc(rpc).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_rpc(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.records.delete_rpc(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_nodes(State(state): State<AppState>) -> Result<Json<Vec<Node>>, ApiError> {
    Ok(Json(state.records.list_nodes().await?))
}

pub async fn create_node(
    State(state): State<AppState>,
    payload: Result<Json<NewNode>, JsonRejection>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let Json(node) = payload?;
    let created = state.records.create_node(node).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_node(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.records.delete_node(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
