//! HTTP 层的错误响应。

use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::MusicBridgeError;

/// 返回给客户端的 JSON 错误，形如 `{"error": "...", "details": "..."}`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP 状态码。
    pub status: StatusCode,
    /// 面向用户的错误信息。
    pub error: String,
    /// 上游或内部的具体原因。
    pub details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl ApiError {
    /// 创建一个不带细节的错误。
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    /// 400 错误。
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// 附加细节。
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// 把领域错误映射为 HTTP 错误。
    ///
    /// * `Validation` → 400，信息即校验信息本身。
    /// * `AllProvidersFailed` → 500，只返回汇总信息。
    /// * 其余 → 500，`error` 为接口自身的提示，`details` 为具体原因。
    pub fn from_domain(message: &str, err: MusicBridgeError) -> Self {
        match err {
            MusicBridgeError::Validation(msg) => Self::bad_request(msg),
            MusicBridgeError::AllProvidersFailed(msg) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            other => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message).with_details(other.to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("Invalid query parameters").with_details(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: &self.error,
            details: self.details.as_deref(),
        });
        (self.status, body).into_response()
    }
}
