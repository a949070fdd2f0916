use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use pricecap_core::{CaptureSession, SessionId};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub limit: Option<i64>,
}

/// Submitted sessions, most recent first.
pub(super) async fn list_submissions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<HistoryQuery>,
) -> Json<ApiResponse<Vec<CaptureSession>>> {
    let limit = usize::try_from(normalize_limit(query.limit)).unwrap_or(usize::MAX);
    let data = state
        .log
        .lock()
        .await
        .history()
        .take(limit)
        .cloned()
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn get_submission(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CaptureSession>>, ApiError> {
    let session = state
        .log
        .lock()
        .await
        .get(SessionId::new(session_id))
        .cloned()
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("submission {session_id} not found"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: session,
        meta: ResponseMeta::new(req_id.0),
    }))
}
