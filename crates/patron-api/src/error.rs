//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("invalid json body: {0}")]
  Json(#[from] JsonRejection),

  #[error("invalid query: {0}")]
  Query(#[from] QueryRejection),

  #[error("invalid csv: {0}")]
  Csv(#[from] patron_csv::Error),

  #[error(transparent)]
  Config(#[from] patron_core::Error),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = match &self {
      ApiError::Json(e) => e.body_text(),
      ApiError::Query(e) => e.body_text(),
      ApiError::Csv(e) => e.to_string(),
      ApiError::Config(e) => e.to_string(),
    };
    tracing::debug!(error = %message, "rejecting request");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
  }
}
