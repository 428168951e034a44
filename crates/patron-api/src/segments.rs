//! Handlers for `/segments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/segments` | Body: `{"rows":[…], "config":{…}}` |
//! | `POST` | `/segments/csv` | `text/csv` body; `?bins=&as_of=&min_visits=&min_spend=` |
//! | `POST` | `/segments/view` | As `/segments`, plus `"query":{…}` |
//! | `GET`  | `/segments/labels` | Segment labels in rule order |
//!
//! Every request recomputes the report from scratch; nothing is stored
//! between calls.

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
};
use chrono::NaiveDate;
use patron_core::{
  Analytics, Bins, RawRow, ScoredRecord, Segment, SegmentReport, ViewQuery,
  compute_segments, filter_view,
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, ColumnsOverride, ConfigOverride, error::ApiError};

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReportBody {
  pub rows:   Vec<RawRow>,
  #[serde(default)]
  pub config: ConfigOverride,
}

/// `POST /segments`
pub async fn report(
  State(state): State<Arc<ApiState>>,
  payload: Result<Json<ReportBody>, JsonRejection>,
) -> Result<Json<SegmentReport>, ApiError> {
  let Json(body) = payload?;
  let config = state.defaults.resolve(body.config);
  let report = compute_segments(&body.rows, &config)?;
  Ok(Json(report))
}

// ─── CSV upload ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CsvParams {
  pub bins:       Option<u8>,
  pub as_of:      Option<NaiveDate>,
  pub min_visits: Option<u32>,
  pub min_spend:  Option<f64>,
}

impl From<CsvParams> for ConfigOverride {
  fn from(params: CsvParams) -> Self {
    Self {
      columns:    ColumnsOverride::default(),
      bins:       params.bins.map(Bins::new),
      as_of:      params.as_of,
      min_visits: params.min_visits,
      min_spend:  params.min_spend,
    }
  }
}

/// `POST /segments/csv[?bins=<n>][&as_of=<date>][&min_visits=<n>][&min_spend=<x>]`
///
/// The body is a headered CSV export read with the server's column mapping.
pub async fn report_csv(
  State(state): State<Arc<ApiState>>,
  params: Result<Query<CsvParams>, QueryRejection>,
  body: String,
) -> Result<Json<SegmentReport>, ApiError> {
  let Query(params) = params?;
  let rows = patron_csv::parse_str(&body)?;

  let config = state.defaults.resolve(params.into());
  let headers = patron_csv::headers(&body)?;
  let missing = patron_csv::missing_columns(&headers, &config.columns);
  if !rows.is_empty() && !missing.is_empty() {
    tracing::warn!(?missing, "uploaded csv lacks mapped columns");
  }

  let report = compute_segments(&rows, &config)?;
  Ok(Json(report))
}

// ─── Working view ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ViewBody {
  pub rows:   Vec<RawRow>,
  #[serde(default)]
  pub config: ConfigOverride,
  #[serde(default)]
  pub query:  ViewQuery,
}

/// Analytics over the whole set, and the records the query selects.
#[derive(Debug, Serialize)]
pub struct ViewResponse {
  pub analytics: Analytics,
  pub records:   Vec<ScoredRecord>,
}

/// `POST /segments/view`
pub async fn view(
  State(state): State<Arc<ApiState>>,
  payload: Result<Json<ViewBody>, JsonRejection>,
) -> Result<Json<ViewResponse>, ApiError> {
  let Json(body) = payload?;
  let config = state.defaults.resolve(body.config);
  let report = compute_segments(&body.rows, &config)?;

  let records = filter_view(&report.records, &body.query)
    .into_iter()
    .cloned()
    .collect();
  Ok(Json(ViewResponse {
    analytics: report.analytics,
    records,
  }))
}

// ─── Labels ───────────────────────────────────────────────────────────────────

/// `GET /segments/labels`
pub async fn labels() -> Json<Vec<&'static str>> {
  Json(Segment::all().map(Segment::label).collect())
}
