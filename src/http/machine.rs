//! Machine provisioning endpoints.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::request::CurrentRequestId;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::provisioning::{ProvisionRequest, Task, TaskId};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub msg: String,
    pub task_id: TaskId,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusQuery {
    pub id: Option<String>,
}

/// `POST /api/create-machine`
pub async fn create_machine(
    State(state): State<AppState>,
    request_id: CurrentRequestId,
    payload: Result<Json<ProvisionRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = payload?;
    let task_id = state.provisioner.submit(request)?;

    tracing::debug!(request_id = %request_id, task_id = %task_id, "Submission accepted");

    Ok(Json(SubmitResponse {
        success: true,
        msg: "task submitted".to_string(),
        task_id,
    }))
}

/// `GET /api/task-status?id=<taskId>`
pub async fn task_status(
    State(state): State<AppState>,
    Query(query): Query<TaskStatusQuery>,
) -> Result<Json<Task>, ApiError> {
    let task = state.provisioner.poll(query.id.as_deref())?;
    Ok(Json(task))
}
