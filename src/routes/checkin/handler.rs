use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{AppState, queries, utils::success_to_api_response};

use super::model::{CheckInsQuery, CreateCheckInRequest, FeedQuery, UpdateCheckInRequest};

#[derive(Debug, Serialize)]
pub struct UpdateCheckInResponse {
    /// 请求中没有任何可更新字段时为 false
    updated: bool,
}

#[axum::debug_handler]
pub async fn find_by_user(
    State(state): State<AppState>,
    Query(query): Query<CheckInsQuery>,
) -> Response {
    match queries::get_check_ins(&state, &query.user_id).await {
        Ok(check_ins) => (StatusCode::OK, success_to_api_response(check_ins)).into_response(),
        Err(e) => {
            tracing::error!("Failed to list check-ins of {}: {}", query.user_id, e);
            e.into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn feed(State(state): State<AppState>, Query(query): Query<FeedQuery>) -> Response {
    match queries::feed(&state, &query.user_id, query.limit).await {
        Ok(check_ins) => (StatusCode::OK, success_to_api_response(check_ins)).into_response(),
        Err(e) => {
            tracing::error!("Failed to build feed for {}: {}", query.user_id, e);
            e.into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn create_check_in(
    State(state): State<AppState>,
    Json(req): Json<CreateCheckInRequest>,
) -> Response {
    match queries::create_check_in(&state, req).await {
        Ok(check_in) => (StatusCode::CREATED, success_to_api_response(check_in)).into_response(),
        Err(e) => {
            tracing::error!("Failed to create check-in: {}", e);
            e.into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn update_check_in(
    State(state): State<AppState>,
    Json(req): Json<UpdateCheckInRequest>,
) -> Response {
    let key = format!("{}@{}", req.user_id, req.time);
    match queries::update_check_in(&state, req).await {
        Ok(updated) => (
            StatusCode::OK,
            success_to_api_response(UpdateCheckInResponse { updated }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to update check-in {}: {}", key, e);
            e.into_response()
        }
    }
}
