use axum::Json;
use serde::{Deserialize, Serialize};

pub mod api_log;
pub mod geo;

pub use api_log::with_api_logging;
pub use geo::{LatLng, calculate_distance, rank_by_distance};

/// 统一的接口返回结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_data: Option<T>,
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code: error_codes::SUCCESS,
        msg: "success".into(),
        resp_data: Some(data),
    })
}

pub fn error_to_api_response<T>(code: i32, msg: String) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        code,
        msg,
        resp_data: None,
    })
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const ALREADY_EXISTS: i32 = 1001;
    pub const NOT_FOUND: i32 = 1004;
    pub const CONFIG_ERROR: i32 = 5001;
    pub const UPSTREAM_ERROR: i32 = 5002;
}
