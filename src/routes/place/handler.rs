use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{AppState, queries, utils::success_to_api_response};

use super::model::NearbyPlacesRequest;

/// 附近地点，按距离排序
#[axum::debug_handler]
pub async fn nearby(
    State(state): State<AppState>,
    Json(req): Json<NearbyPlacesRequest>,
) -> Response {
    let search = match req.to_search(state.config.max_search_radius) {
        Ok(search) => search,
        Err(e) => return e.into_response(),
    };

    match queries::nearby_places(&state, &search, req.selected_place_id.as_deref()).await {
        Ok(places) => (StatusCode::OK, success_to_api_response(places)).into_response(),
        Err(e) => {
            tracing::error!("Nearby search failed: {}", e);
            e.into_response()
        }
    }
}
