use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{AppState, error::AppError, queries, utils::success_to_api_response};

use super::model::{SearchQuery, UserIdQuery};

#[axum::debug_handler]
pub async fn find_by_id(
    State(state): State<AppState>,
    Query(query): Query<UserIdQuery>,
) -> Response {
    match queries::get_user(&state, &query.user_id).await {
        Ok(Some(user)) => (StatusCode::OK, success_to_api_response(user)).into_response(),
        Ok(None) => AppError::NotFound.into_response(),
        Err(e) => {
            tracing::error!("Failed to load user {}: {}", query.user_id, e);
            e.into_response()
        }
    }
}

/// 带 `follower_id` 时只在其关注的人中搜索
#[axum::debug_handler]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let result = match query.follower_id.as_deref() {
        Some(follower_id) if !follower_id.is_empty() => {
            queries::search_friends(&state, &query.q, follower_id).await
        }
        _ => queries::search_users(&state, &query.q).await,
    };

    match result {
        Ok(users) => (StatusCode::OK, success_to_api_response(users)).into_response(),
        Err(e) => {
            tracing::error!("User search '{}' failed: {}", query.q, e);
            e.into_response()
        }
    }
}
