//! Axum HTTP surface: the only way a `ModRequest` enters the system and the
//! only way a caller observes a `ModResult`. Grounded in
//! `original_source/server/app.py` / `levelup_server/app.py`, restructured
//! from Flask's `@app.route` handlers into `axum::Router` handlers that
//! talk to the `JobExecutor` through its channel and status map rather than
//! processing the mod inline on the request thread.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::edits::PrototypeChange;
use crate::job::{JobExecutor, ModRequest, ModSource};
use crate::result::ModResult;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<JobExecutor>,
}

pub fn router(executor: Arc<JobExecutor>) -> Router {
    Router::new()
        .route("/mods", post(submit_mod))
        .route("/mods/{id}/status", get(mod_status))
        .route("/queue/status", get(queue_status))
        .with_state(AppState { executor })
}

#[derive(Debug, Deserialize)]
pub struct SubmitModRequest {
    repo_url: String,
    #[serde(rename = "type")]
    kind: String,
    description: String,
    #[serde(default)]
    mod_type: Option<String>,
    #[serde(default)]
    commit_hash: Option<String>,
    /// Only meaningful when `mod_type` is `"change_prototype"`: the worklist
    /// `job::executor::process_one` hands to `PrototypeChangeGenerator`.
    #[serde(default)]
    prototype_changes: Vec<PrototypeChange>,
}

#[derive(Debug, Serialize)]
struct SubmitModResponse {
    id: Uuid,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct QueueStatusResponse {
    queue_depth: usize,
    results: Vec<ModResult>,
}

async fn submit_mod(
    State(state): State<AppState>,
    Json(body): Json<SubmitModRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let source = match body.kind.as_str() {
        "builtin" => ModSource::Builtin {
            mod_type: body.mod_type.unwrap_or_default(),
            prototype_changes: body.prototype_changes,
        },
        "commit" => ModSource::Commit {
            commit_hash: body.commit_hash.unwrap_or_default(),
        },
        other => {
            let response = ErrorResponse { error: format!("unknown mod type: {other}") };
            return (StatusCode::BAD_REQUEST, Json(serde_json::to_value(response).unwrap()));
        }
    };

    match ModRequest::new(body.repo_url, body.description, source) {
        Ok(request) => {
            let id = state.executor.submit(request);
            info!(%id, "submitted mod request");
            (
                StatusCode::ACCEPTED,
                Json(serde_json::to_value(SubmitModResponse { id }).unwrap()),
            )
        }
        Err(e) => {
            let response = ErrorResponse { error: e.to_string() };
            (StatusCode::BAD_REQUEST, Json(serde_json::to_value(response).unwrap()))
        }
    }
}

async fn mod_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<ModResult>, StatusCode> {
    state.executor.status(id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn queue_status(State(state): State<AppState>) -> Json<QueueStatusResponse> {
    Json(QueueStatusResponse {
        queue_depth: state.executor.queue_depth(),
        results: state.executor.all_statuses(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_deserializes_builtin_shape() {
        let body: SubmitModRequest = serde_json::from_str(
            r#"{"repo_url":"https://example.com/org/repo.git","type":"builtin","description":"d","mod_type":"add_override"}"#,
        )
        .unwrap();
        assert_eq!(body.kind, "builtin");
        assert_eq!(body.mod_type.as_deref(), Some("add_override"));
    }

    #[test]
    fn submit_request_deserializes_commit_shape() {
        let body: SubmitModRequest = serde_json::from_str(
            r#"{"repo_url":"https://example.com/org/repo.git","type":"commit","description":"d","commit_hash":"abc123"}"#,
        )
        .unwrap();
        assert_eq!(body.kind, "commit");
        assert_eq!(body.commit_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn submit_request_deserializes_change_prototype_worklist() {
        let body: SubmitModRequest = serde_json::from_str(
            r#"{
                "repo_url":"https://example.com/org/repo.git",
                "type":"builtin",
                "description":"rename add to sum",
                "mod_type":"change_prototype",
                "prototype_changes":[
                    {"kind":"rename","qualified_name":"ns::add","new_name":"sum"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(body.mod_type.as_deref(), Some("change_prototype"));
        assert_eq!(body.prototype_changes.len(), 1);
    }
}
