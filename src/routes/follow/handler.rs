use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{AppState, error::AppError, queries, utils::success_to_api_response};

use super::model::{CreateFollowRequest, FollowersQuery, FollowingQuery};

#[axum::debug_handler]
pub async fn find_followers(
    State(state): State<AppState>,
    Query(query): Query<FollowersQuery>,
) -> Response {
    match queries::get_followers(&state, &query.user_id).await {
        Ok(edges) => (StatusCode::OK, success_to_api_response(edges)).into_response(),
        Err(e) => {
            tracing::error!("Failed to list followers of {}: {}", query.user_id, e);
            e.into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn find_following(
    State(state): State<AppState>,
    Query(query): Query<FollowingQuery>,
) -> Response {
    match queries::get_following(&state, &query.follower_id).await {
        Ok(edges) => (StatusCode::OK, success_to_api_response(edges)).into_response(),
        Err(e) => {
            tracing::error!("Failed to list users followed by {}: {}", query.follower_id, e);
            e.into_response()
        }
    }
}

#[axum::debug_handler]
pub async fn create_follow(
    State(state): State<AppState>,
    Json(req): Json<CreateFollowRequest>,
) -> Response {
    match queries::create_follow(&state, &req.user_id, &req.follower_id).await {
        Ok(edge) => (StatusCode::CREATED, success_to_api_response(edge)).into_response(),
        // 重复关注是预期内的结果，不记为错误
        Err(AppError::AlreadyExists) => AppError::AlreadyExists.into_response(),
        Err(e) => {
            tracing::error!(
                "Failed to create follow {} -> {}: {}",
                req.follower_id,
                req.user_id,
                e
            );
            e.into_response()
        }
    }
}
