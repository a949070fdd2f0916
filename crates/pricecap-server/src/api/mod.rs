mod captures;
mod parse;
mod sites;
mod submissions;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use pricecap_archive::JsonlArchive;
use pricecap_core::{CaptureCatalog, CaptureError, EditError, SentenceParser, SubmissionLog};
use pricecap_recognition::AnyRecognizer;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

pub use captures::DeskSlot;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CaptureCatalog>,
    pub parser: Arc<SentenceParser>,
    /// Open capture desks keyed by capture id. Lock before `log`.
    pub desks: Arc<Mutex<HashMap<Uuid, DeskSlot>>>,
    pub log: Arc<Mutex<SubmissionLog>>,
    pub archive: Option<Arc<JsonlArchive>>,
    pub recognizer: Arc<AnyRecognizer>,
    pub recognition_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub fn new(
        catalog: CaptureCatalog,
        log: SubmissionLog,
        archive: Option<JsonlArchive>,
        recognizer: AnyRecognizer,
        recognition_timeout: Duration,
    ) -> Self {
        let parser = Arc::new(catalog.parser());
        Self {
            catalog: Arc::new(catalog),
            parser,
            desks: Arc::default(),
            log: Arc::new(Mutex::new(log)),
            archive: archive.map(Arc::new),
            recognizer: Arc::new(recognizer),
            recognition_timeout,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    archive: &'static str,
    sessions: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_capture_error(request_id: String, error: &CaptureError) -> ApiError {
    match error {
        CaptureError::RecordingInProgress | CaptureError::NotRecording => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        CaptureError::MissingLocation => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        CaptureError::Edit(EditError::NotFound) => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        CaptureError::Edit(EditError::Invalid(e)) => {
            ApiError::new(request_id, "validation_error", e.to_string())
        }
        CaptureError::Log(e) => {
            tracing::error!(error = %e, "submission log rejected session");
            ApiError::new(request_id, "internal_error", "submission could not be recorded")
        }
    }
}

pub(super) fn capture_not_found(request_id: String, capture_id: Uuid) -> ApiError {
    ApiError::new(
        request_id,
        "not_found",
        format!("capture {capture_id} not found"),
    )
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/sites", get(sites::list_sites))
        .route("/api/v1/parse", post(parse::parse_sentence))
        .route("/api/v1/captures", post(captures::create_capture))
        .route(
            "/api/v1/captures/{capture_id}",
            get(captures::get_capture).delete(captures::close_capture),
        )
        .route(
            "/api/v1/captures/{capture_id}/location",
            put(captures::set_location),
        )
        .route(
            "/api/v1/captures/{capture_id}/lines",
            post(captures::add_line),
        )
        .route(
            "/api/v1/captures/{capture_id}/items",
            post(captures::add_item),
        )
        .route(
            "/api/v1/captures/{capture_id}/items/{item_id}",
            patch(captures::edit_item),
        )
        .route(
            "/api/v1/captures/{capture_id}/recognize",
            post(captures::recognize),
        )
        .route(
            "/api/v1/captures/{capture_id}/recognize/cancel",
            post(captures::cancel_recognition),
        )
        .route(
            "/api/v1/captures/{capture_id}/submit",
            post(captures::submit_capture),
        )
        .route("/api/v1/submissions", get(submissions::list_submissions))
        .route(
            "/api/v1/submissions/{session_id}",
            get(submissions::get_submission),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let sessions = state.log.lock().await.len();
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            archive: if state.archive.is_some() {
                "enabled"
            } else {
                "memory_only"
            },
            sessions,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

pub fn rate_limit_state(requests_per_minute: usize) -> RateLimitState {
    RateLimitState::new(requests_per_minute, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
