//! JSON REST API for Patron.
//!
//! Exposes an axum [`Router`] that runs the segmentation pipeline over rows
//! supplied in each request. The server holds no customer data; it only
//! carries the default settings requests fall back to.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", patron_api::api_router(ApiState::default()))
//! ```

pub mod error;
pub mod segments;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use chrono::{Local, NaiveDate};
use patron_core::{Bins, ColumnMapping, SegmentConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Largest accepted request body.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Server-wide pipeline settings, used for anything a request leaves out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentDefaults {
  pub columns:    ColumnMapping,
  pub bins:       Bins,
  pub min_visits: u32,
  pub min_spend:  f64,
}

/// Per-request overrides. Absent fields take the server default; `as_of`
/// defaults to today's local date.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigOverride {
  pub columns:    ColumnsOverride,
  pub bins:       Option<Bins>,
  pub as_of:      Option<NaiveDate>,
  pub min_visits: Option<u32>,
  pub min_spend:  Option<f64>,
}

/// Column names to replace, field by field. An empty string unmaps an
/// optional column.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnsOverride {
  pub id:         Option<String>,
  pub name:       Option<String>,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub last_visit: Option<String>,
  pub visits:     Option<String>,
  pub spend:      Option<String>,
}

impl ColumnsOverride {
  fn apply(self, base: &ColumnMapping) -> ColumnMapping {
    ColumnMapping {
      id:         self.id.or_else(|| base.id.clone()),
      name:       self.name.unwrap_or_else(|| base.name.clone()),
      email:      self.email.or_else(|| base.email.clone()),
      phone:      self.phone.or_else(|| base.phone.clone()),
      last_visit: self.last_visit.unwrap_or_else(|| base.last_visit.clone()),
      visits:     self.visits.unwrap_or_else(|| base.visits.clone()),
      spend:      self.spend.unwrap_or_else(|| base.spend.clone()),
    }
  }
}

impl SegmentDefaults {
  /// Merge `overrides` onto these defaults.
  pub fn resolve(&self, overrides: ConfigOverride) -> SegmentConfig {
    SegmentConfig {
      columns:    overrides.columns.apply(&self.columns),
      bins:       overrides.bins.unwrap_or(self.bins),
      as_of:      overrides
        .as_of
        .unwrap_or_else(|| Local::now().date_naive()),
      min_visits: overrides.min_visits.unwrap_or(self.min_visits),
      min_spend:  overrides.min_spend.unwrap_or(self.min_spend),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Debug, Clone, Default)]
pub struct ApiState {
  pub defaults: SegmentDefaults,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router(state: ApiState) -> Router<()> {
  Router::new()
    .route("/segments", post(segments::report))
    .route("/segments/csv", post(segments::report_csv))
    .route("/segments/view", post(segments::view))
    .route("/segments/labels", get(segments::labels))
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .layer(TraceLayer::new_for_http())
    .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tower::ServiceExt;

  use super::*;

  async fn send(
    method:       &str,
    uri:          &str,
    content_type: &str,
    body:         String,
  ) -> (StatusCode, Value) {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, content_type)
      .body(Body::from(body))
      .unwrap();
    let resp = api_router(ApiState::default()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    send("POST", uri, "application/json", body.to_string()).await
  }

  fn rows() -> Value {
    json!([
      { "name": "Ada", "last_visit": "2024-06-28", "visits": "14", "total_spend": "1200" },
      { "name": "Ben", "last_visit": "2024-06-30", "visits": "1",  "total_spend": "35" },
      { "name": "Cy",  "last_visit": "2023-11-02", "visits": "9",  "total_spend": "640" },
      { "name": "Dee", "last_visit": "2024-02-14", "visits": "3",  "total_spend": "90" },
      { "name": "",    "last_visit": "2024-02-14", "visits": "3",  "total_spend": "90" }
    ])
  }

  // ── Labels ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn labels_are_listed_in_rule_order() {
    let (status, body) = send("GET", "/segments/labels", "text/plain", String::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      body,
      json!([
        "VIP", "Loyal", "Big Spender", "New", "Promising", "At Risk",
        "Lapsed", "Hibernating"
      ])
    );
  }

  // ── Report ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn json_rows_produce_a_report() {
    let (status, body) = post_json(
      "/segments",
      json!({ "rows": rows(), "config": { "as_of": "2024-06-30", "bins": 4 } }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["as_of"], "2024-06-30");
    assert_eq!(body["bins"], 4);
    assert_eq!(body["records"].as_array().unwrap().len(), 4);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["analytics"]["total_customers"], 4);
    assert_eq!(body["records"][1]["recency_days"], 0);
  }

  #[tokio::test]
  async fn config_is_optional() {
    let (status, body) = post_json("/segments", json!({ "rows": [] })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["bins"], 5);
    assert_eq!(body["records"], json!([]));
  }

  #[tokio::test]
  async fn empty_required_mapping_is_a_bad_request() {
    let (status, body) = post_json(
      "/segments",
      json!({ "rows": rows(), "config": { "columns": { "visits": "" } } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("visits"), "{body}");
  }

  #[tokio::test]
  async fn malformed_json_is_a_bad_request() {
    let (status, body) =
      send("POST", "/segments", "application/json", "{ not json".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  // ── CSV upload ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn csv_upload_uses_query_settings() {
    let csv = "\
name,email,last_visit,visits,total_spend
Ada,ada@example.com,2024-06-28,14,1200
Ben,,2024-06-30,1,35
Cy,cy@example.com,2023-11-02,9,640
";
    let (status, body) = send(
      "POST",
      "/segments/csv?as_of=2024-06-30&bins=3&min_visits=2",
      "text/csv",
      csv.to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["bins"], 3);
    assert_eq!(body["skipped"], 1);
    let names: Vec<_> = body["records"]
      .as_array()
      .unwrap()
      .iter()
      .map(|r| r["name"].as_str().unwrap().to_string())
      .collect();
    assert_eq!(names, vec!["Ada", "Cy"]);
  }

  #[tokio::test]
  async fn negative_min_spend_is_a_bad_request() {
    let (status, body) = send(
      "POST",
      "/segments/csv?min_spend=-5",
      "text/csv",
      "name,last_visit,visits,total_spend\n".into(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("min_spend"), "{body}");
  }

  #[tokio::test]
  async fn unparseable_query_is_a_bad_request() {
    let (status, body) =
      send("POST", "/segments/csv?as_of=yesterday", "text/csv", String::new())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  // ── Working view ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn view_filters_and_sorts() {
    let (status, body) = post_json(
      "/segments/view",
      json!({
        "rows": rows(),
        "config": { "as_of": "2024-06-30" },
        "query": { "sort": "spend", "limit": 2 }
      }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["analytics"]["total_customers"], 4);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "Ada");
    assert_eq!(records[1]["name"], "Cy");
  }

  #[tokio::test]
  async fn view_search_matches_substrings() {
    let (status, body) = post_json(
      "/segments/view",
      json!({
        "rows": rows(),
        "config": { "as_of": "2024-06-30" },
        "query": { "search": "DE" }
      }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "Dee");
  }

  // ── Defaults ──────────────────────────────────────────────────────────────

  #[test]
  fn overrides_fall_back_to_defaults() {
    let defaults = SegmentDefaults {
      bins: Bins::new(6),
      min_visits: 2,
      ..SegmentDefaults::default()
    };
    let config = defaults.resolve(ConfigOverride {
      min_visits: Some(5),
      as_of: NaiveDate::from_ymd_opt(2024, 1, 1),
      ..ConfigOverride::default()
    });
    assert_eq!(config.bins, Bins::new(6));
    assert_eq!(config.min_visits, 5);
    assert_eq!(config.min_spend, 0.0);
    assert_eq!(config.columns, ColumnMapping::default());
    assert_eq!(config.as_of, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
  }

  #[test]
  fn column_overrides_merge_with_server_mapping() {
    let defaults = SegmentDefaults {
      columns: ColumnMapping {
        name: "Customer".into(),
        phone: None,
        ..ColumnMapping::default()
      },
      ..SegmentDefaults::default()
    };
    let overrides: ConfigOverride = serde_json::from_value(json!({
      "columns": { "spend": "Revenue", "email": "" }
    }))
    .unwrap();

    let columns = defaults.resolve(overrides).columns;
    assert_eq!(columns.name, "Customer");
    assert_eq!(columns.spend, "Revenue");
    assert_eq!(columns.visits, "visits");
    assert_eq!(columns.phone, None);
    assert_eq!(columns.email_column(), None);
  }
}
