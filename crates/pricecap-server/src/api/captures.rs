use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use pricecap_core::{
    AddOutcome, CaptureDesk, CaptureError, CaptureItem, CapturePhase, CaptureSession, DraftEntry,
    DraftId, ItemPatch, Location, RecognitionOutcome,
};
use pricecap_recognition::recognize_with;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{capture_not_found, map_capture_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// A capture desk plus the cancel handle of its in-flight recognition.
#[derive(Debug)]
pub struct DeskSlot {
    pub(super) desk: CaptureDesk,
    pub(super) cancel: Option<CancellationToken>,
}

impl DeskSlot {
    fn new(desk: CaptureDesk) -> Self {
        Self { desk, cancel: None }
    }

    /// Signals the in-flight recognition to stop.
    ///
    /// Callers hold the desks lock, and the recognition task re-checks the
    /// token under that same lock, so a recognition that already produced
    /// text still settles as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NotRecording`] if no recognition is pending.
    pub(super) fn cancel_in_flight(&mut self) -> Result<(), CaptureError> {
        let token = self.cancel.take().ok_or(CaptureError::NotRecording)?;
        token.cancel();
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DeskView {
    capture_id: Uuid,
    phase: CapturePhase,
    location: Option<String>,
    raw_text: Option<String>,
    items: Vec<DraftEntry>,
}

impl DeskView {
    fn of(capture_id: Uuid, desk: &CaptureDesk) -> Self {
        Self {
            capture_id,
            phase: desk.phase().clone(),
            location: desk.location().map(|l| l.as_str().to_owned()),
            raw_text: desk.raw_text().map(str::to_owned),
            items: desk.draft().entries().to_vec(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CreateCaptureRequest {
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationRequest {
    pub location: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct LineRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(super) struct AddResult {
    added: bool,
    item_id: Option<DraftId>,
    capture: DeskView,
}

#[derive(Debug, Serialize)]
pub(super) struct RecognizeResult {
    outcome: RecognitionOutcome,
    added: bool,
    item_id: Option<DraftId>,
    capture: DeskView,
}

#[derive(Debug, Serialize)]
pub(super) struct CancelResult {
    cancelled: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct CloseResult {
    capture_id: Uuid,
    discarded_items: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct SubmitResult {
    session: CaptureSession,
    archived: bool,
}

fn resolve_site(state: &AppState, req_id: &RequestId, name: &str) -> Result<Location, ApiError> {
    state.catalog.site(name).ok_or_else(|| {
        ApiError::new(
            req_id.0.clone(),
            "validation_error",
            format!("unknown capture site: {name}"),
        )
    })
}

fn added_parts(outcome: AddOutcome) -> (bool, Option<DraftId>) {
    match outcome {
        AddOutcome::Added(id) => (true, Some(id)),
        AddOutcome::NoMatch => (false, None),
    }
}

pub(super) async fn create_capture(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<CreateCaptureRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<DeskView>>), ApiError> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let mut desk = CaptureDesk::new(Arc::clone(&state.parser));
    if let Some(name) = body.location.as_deref() {
        desk.set_location(resolve_site(&state, &req_id, name)?);
    }

    let capture_id = Uuid::new_v4();
    let view = DeskView::of(capture_id, &desk);
    state
        .desks
        .lock()
        .await
        .insert(capture_id, DeskSlot::new(desk));

    tracing::info!(%capture_id, "capture opened");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: view,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn get_capture(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeskView>>, ApiError> {
    let desks = state.desks.lock().await;
    let slot = desks
        .get(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;

    Ok(Json(ApiResponse {
        data: DeskView::of(capture_id, &slot.desk),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn set_location(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
    Json(body): Json<LocationRequest>,
) -> Result<Json<ApiResponse<DeskView>>, ApiError> {
    let location = resolve_site(&state, &req_id, &body.location)?;

    let mut desks = state.desks.lock().await;
    let slot = desks
        .get_mut(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;
    slot.desk.set_location(location);

    Ok(Json(ApiResponse {
        data: DeskView::of(capture_id, &slot.desk),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn add_line(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
    Json(body): Json<LineRequest>,
) -> Result<Json<ApiResponse<AddResult>>, ApiError> {
    let mut desks = state.desks.lock().await;
    let slot = desks
        .get_mut(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;

    let outcome = slot
        .desk
        .add_from_text(&body.text)
        .map_err(|e| map_capture_error(req_id.0.clone(), &e))?;
    if outcome == AddOutcome::NoMatch {
        tracing::info!(%capture_id, "line did not match the sentence grammar");
    }

    let (added, item_id) = added_parts(outcome);
    Ok(Json(ApiResponse {
        data: AddResult {
            added,
            item_id,
            capture: DeskView::of(capture_id, &slot.desk),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn add_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
    Json(item): Json<CaptureItem>,
) -> Result<Json<ApiResponse<AddResult>>, ApiError> {
    let mut desks = state.desks.lock().await;
    let slot = desks
        .get_mut(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;

    let id = slot
        .desk
        .add_recognized(item)
        .map_err(|e| map_capture_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: AddResult {
            added: true,
            item_id: Some(id),
            capture: DeskView::of(capture_id, &slot.desk),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn edit_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((capture_id, item_id)): Path<(Uuid, u64)>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<ApiResponse<DeskView>>, ApiError> {
    let mut desks = state.desks.lock().await;
    let slot = desks
        .get_mut(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;

    slot.desk
        .edit(DraftId::new(item_id), &patch)
        .map_err(|e| map_capture_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: DeskView::of(capture_id, &slot.desk),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Records one utterance and adds it to the draft if it parses.
///
/// The desk lock is released while the recognizer runs so the capture stays
/// readable and the recognition can be cancelled. The work runs in its own
/// task so a dropped client connection does not strand the desk in
/// `Recording`.
pub(super) async fn recognize(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
) -> Result<Json<ApiResponse<RecognizeResult>>, ApiError> {
    let token = CancellationToken::new();
    {
        let mut desks = state.desks.lock().await;
        let slot = desks
            .get_mut(&capture_id)
            .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;
        slot.desk
            .begin_recording()
            .map_err(|e| map_capture_error(req_id.0.clone(), &e))?;
        slot.cancel = Some(token.clone());
    }

    tracing::info!(%capture_id, "recognition started");
    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let outcome = recognize_with(
            task_state.recognizer.as_ref(),
            task_state.recognition_timeout,
            &token,
        )
        .await;

        let mut desks = task_state.desks.lock().await;
        let slot = desks
            .get_mut(&capture_id)
            .ok_or(CaptureError::NotRecording)?;
        slot.cancel = None;
        // A cancel that landed after the recognizer returned still wins.
        let outcome = if token.is_cancelled() {
            RecognitionOutcome::Cancelled
        } else {
            outcome
        };

        let added = match slot.desk.finish_recording(outcome.clone())? {
            Some(text) => slot.desk.add_from_text(&text)?,
            None => AddOutcome::NoMatch,
        };
        Ok::<_, CaptureError>((outcome, added, DeskView::of(capture_id, &slot.desk)))
    });

    let (outcome, added, capture) = handle
        .await
        .map_err(|e| {
            tracing::error!(%capture_id, error = %e, "recognition task failed");
            ApiError::new(req_id.0.clone(), "internal_error", "recognition task failed")
        })?
        .map_err(|e| map_capture_error(req_id.0.clone(), &e))?;

    tracing::info!(%capture_id, outcome = ?outcome, "recognition finished");
    let (added, item_id) = added_parts(added);
    Ok(Json(ApiResponse {
        data: RecognizeResult {
            outcome,
            added,
            item_id,
            capture,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn cancel_recognition(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CancelResult>>, ApiError> {
    let mut desks = state.desks.lock().await;
    let slot = desks
        .get_mut(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;

    slot.cancel_in_flight().map_err(|e| map_capture_error(req_id.0.clone(), &e))?;

    tracing::info!(%capture_id, "recognition cancelled");
    Ok(Json(ApiResponse {
        data: CancelResult { cancelled: true },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// Discards a capture desk and its unsubmitted draft.
///
/// A desk with a pending recognition is refused; cancel it first.
pub(super) async fn close_capture(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CloseResult>>, ApiError> {
    let mut desks = state.desks.lock().await;
    let slot = desks
        .get(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;
    if slot.desk.is_recording() {
        let err = CaptureError::RecordingInProgress;
        return Err(map_capture_error(req_id.0.clone(), &err));
    }
    let discarded_items = slot.desk.draft().len();
    desks.remove(&capture_id);
    drop(desks);

    tracing::info!(%capture_id, discarded_items, "capture closed");
    Ok(Json(ApiResponse {
        data: CloseResult {
            capture_id,
            discarded_items,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn submit_capture(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(capture_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SubmitResult>>, ApiError> {
    let mut desks = state.desks.lock().await;
    let slot = desks
        .get_mut(&capture_id)
        .ok_or_else(|| capture_not_found(req_id.0.clone(), capture_id))?;

    let mut log = state.log.lock().await;
    let session = slot
        .desk
        .submit(&mut log)
        .map_err(|e| map_capture_error(req_id.0.clone(), &e))?;
    drop(desks);

    // The log lock is held across the append so archive order matches
    // sequence order.
    let archived = match state.archive.as_deref() {
        Some(archive) => match archive.append(&session).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    session_id = %session.id(),
                    error = %e,
                    "failed to archive submitted session"
                );
                false
            }
        },
        None => false,
    };
    drop(log);

    tracing::info!(
        %capture_id,
        session_id = %session.id(),
        items = session.items().len(),
        location = %session.location(),
        archived,
        "capture submitted"
    );
    Ok(Json(ApiResponse {
        data: SubmitResult { session, archived },
        meta: ResponseMeta::new(req_id.0),
    }))
}
