//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use lineage_core::{Error, ErrorCode};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] Error),

  #[error("invalid request body: {0}")]
  Body(#[from] JsonRejection),

  #[error("invalid query string: {0}")]
  Query(#[from] QueryRejection),
}

impl ApiError {
  pub fn code(&self) -> ErrorCode {
    match self {
      ApiError::Core(e) => e.code(),
      ApiError::Body(_) | ApiError::Query(_) => ErrorCode::ValidationError,
    }
  }
}

fn status(code: ErrorCode) -> StatusCode {
  match code {
    ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
    ErrorCode::NotFound => StatusCode::NOT_FOUND,
    ErrorCode::Conflict => StatusCode::CONFLICT,
    ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let code = self.code();
    if code == ErrorCode::InternalError {
      tracing::error!(error = %self, "request failed");
    }
    (status(code), Json(json!({ "code": code, "error": self.to_string() }))).into_response()
  }
}
