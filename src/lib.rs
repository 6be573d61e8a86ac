use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use config::Config;
use redis::Client as RedisClient;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod places;
pub mod queries;
pub mod routes;
pub mod store;
pub mod utils;

use cache::QueryCache;
use places::PlacesClient;
use store::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: StoreHandle,
    pub places: PlacesClient,
    pub cache: QueryCache,
}

impl AppState {
    /// 存储客户端延迟到第一次请求时才创建
    pub fn from_config(config: Config, redis: Option<Arc<RedisClient>>) -> Self {
        Self {
            store: StoreHandle::lazy(config.clone()),
            places: PlacesClient::from_config(&config),
            cache: QueryCache::new(redis),
            config,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // 用户
        .route("/users/by-id", get(routes::user::find_by_id))
        .route("/users/search", get(routes::user::search))
        // 关注关系
        .route("/follows/followers", get(routes::follow::find_followers))
        .route("/follows/following", get(routes::follow::find_following))
        .route("/follows/create", post(routes::follow::create_follow))
        // 签到
        .route("/checkins/by-user", get(routes::checkin::find_by_user))
        .route("/checkins/feed", get(routes::checkin::feed))
        .route("/checkins/create", post(routes::checkin::create_check_in))
        .route("/checkins/update", put(routes::checkin::update_check_in))
        // 地点
        .route("/places/nearby", post(routes::place::nearby))
        .layer(axum::middleware::from_fn(middleware::log_errors))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::queries::tests::{memory_state, seed_user, spawn_fake_places};

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn user_lookup_wraps_result_in_envelope() {
        let (state, store) = memory_state();
        seed_user(&store, &state, "u1", "Ada").await;
        let app = router(state);

        let (status, body) = send(app.clone(), get_request("/users/by-id?user_id=u1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 0);
        assert_eq!(body["resp_data"]["name"], "Ada");

        let (status, body) = send(app, get_request("/users/by-id?user_id=nobody")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 1004);
        assert!(body.get("resp_data").is_none());
    }

    #[tokio::test]
    async fn duplicate_follow_is_conflict() {
        let (state, _store) = memory_state();
        let app = router(state);
        let edge = json!({ "user_id": "U", "follower_id": "F" });

        let (status, body) = send(app.clone(), json_request("POST", "/follows/create", edge.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["resp_data"]["follower_id"], "F");

        let (status, body) = send(app.clone(), json_request("POST", "/follows/create", edge)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], 1001);

        let (_, body) = send(app, get_request("/follows/followers?user_id=U")).await;
        assert_eq!(body["resp_data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn check_in_create_update_and_list() {
        let (state, _store) = memory_state();
        let app = router(state);

        let (status, _) = send(
            app.clone(),
            json_request(
                "POST",
                "/checkins/create",
                json!({ "user_id": "u1", "location": "Cafe", "time": 100 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app.clone(),
            json_request(
                "PUT",
                "/checkins/update",
                json!({ "user_id": "u1", "time": 100, "line_minutes": 30, "notes": "busy" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resp_data"]["updated"], true);

        let (status, body) = send(
            app.clone(),
            json_request(
                "PUT",
                "/checkins/update",
                json!({ "user_id": "u1", "time": 100, "line_minutes": 7 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1000);

        let (_, body) = send(app, get_request("/checkins/by-user?user_id=u1")).await;
        assert_eq!(body["resp_data"][0]["line_minutes"], 30);
        assert_eq!(body["resp_data"][0]["notes"], "busy");
    }

    #[tokio::test]
    async fn nearby_without_api_key_is_server_error() {
        let (state, _store) = memory_state();
        let app = router(state);

        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/places/nearby",
                json!({ "latitude": 1.0, "longitude": 2.0, "for_check_in": true }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 5001);
    }

    #[tokio::test]
    async fn nearby_route_pins_selected_place() {
        let (mut state, _store) = memory_state();
        let hits = Arc::new(AtomicUsize::new(0));
        state.places = PlacesClient::new(spawn_fake_places(hits).await, Some("k".to_string()));
        let app = router(state);

        let (status, body) = send(
            app,
            json_request(
                "POST",
                "/places/nearby",
                json!({
                    "latitude": 0.0,
                    "longitude": 0.0,
                    "for_check_in": true,
                    "selected_place_id": "far"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body["resp_data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["far", "near", "mid", "nowhere"]);
    }
}
