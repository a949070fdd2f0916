use axum::{extract::State, Extension, Json};

use crate::middleware::RequestId;

use super::{ApiResponse, AppState, ResponseMeta};

pub(super) async fn list_sites(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse {
        data: state.catalog.sites.clone(),
        meta: ResponseMeta::new(req_id.0),
    })
}
