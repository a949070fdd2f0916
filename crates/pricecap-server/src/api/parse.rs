use axum::{extract::State, Extension, Json};
use pricecap_core::CaptureItem;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ParseRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ParseResult {
    matched: bool,
    item: Option<CaptureItem>,
}

/// Dry-run of the sentence parser; touches no capture.
pub(super) async fn parse_sentence(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ParseRequest>,
) -> Json<ApiResponse<ParseResult>> {
    let item = state.parser.parse(&body.text).into_item();
    Json(ApiResponse {
        data: ParseResult {
            matched: item.is_some(),
            item,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
