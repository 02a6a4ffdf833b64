// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::repositories::job_repository::RepositoryError;
use crate::orchestrator::EngineError;

/// 控制面错误类型
///
/// 把编排层错误映射为HTTP状态码，提供统一的JSON错误体
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Conflict { .. } => StatusCode::CONFLICT,
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::InvalidState { .. } => StatusCode::BAD_REQUEST,
            EngineError::Validation { .. } => StatusCode::BAD_REQUEST,
            EngineError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            EngineError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self(EngineError::Validation {
            message: errors.to_string(),
        })
    }
}
