use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 数据访问层与地点搜索的错误分类
///
/// 实现 `Clone`，以便缓存层把同一个失败结果分发给所有合并等待的调用方。
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// 缺少凭证或密钥等配置问题，在任何网络调用之前失败
    #[error("{0}")]
    Config(String),

    #[error("invalid input: {0}")]
    Validation(String),

    /// 地点搜索接口返回非 2xx
    #[error("Places search failed: {status} {body}")]
    Upstream { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// 存储服务拒绝了请求，`kind` 为错误类型名
    #[error("store error {kind}: {message}")]
    Store { kind: String, message: String },

    /// 条件写入被拒绝：记录已存在
    #[error("record already exists")]
    AlreadyExists,

    /// 条件更新被拒绝：记录不存在
    #[error("record not found")]
    NotFound,

    #[error("failed to decode response: {0}")]
    Decode(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::CONFIG_ERROR,
            ),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::AlreadyExists => (StatusCode::CONFLICT, error_codes::ALREADY_EXISTS),
            AppError::NotFound => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Upstream { .. }
            | AppError::Transport(_)
            | AppError::Store { .. }
            | AppError::Decode(_) => (StatusCode::BAD_GATEWAY, error_codes::UPSTREAM_ERROR),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Decode(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        (status, error_to_api_response::<()>(code, self.to_string())).into_response()
    }
}
