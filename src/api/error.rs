use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::core::chain::ChainError;
use crate::models::context::FieldError;

pub type ApiResult<T> = Result<T, ApiError>;

/// 接口层错误及其 HTTP 状态码映射
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {} field(s) invalid", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Bad request: {message}")]
    BadRequest { status: StatusCode, message: String },

    #[error("Chain invocation failed: {0}")]
    Chain(#[from] ChainError),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Vec<FieldError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "validation_error",
                    message: "Request body failed validation".into(),
                    detail: Some(detail),
                },
            ),
            ApiError::BadRequest { status, message } => (
                status,
                ErrorBody {
                    error: "bad_request",
                    message,
                    detail: None,
                },
            ),
            ApiError::Chain(e) => {
                // 具体原因只写日志，不返回给调用方
                error!(error = %e, "问答链调用失败");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal_error",
                        message: "Internal server error".into(),
                        detail: None,
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
