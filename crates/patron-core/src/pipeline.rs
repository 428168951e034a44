//! The end-to-end segmentation pipeline.
//!
//! [`compute_segments`] is a pure function of its inputs: the same rows and
//! config always give the same report. Callers recompute from scratch
//! whenever anything changes; nothing is cached or mutated.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
  aggregate::{Analytics, SegmentBreakdown, SegmentCounts, aggregate},
  customer::{Bins, ColumnMapping, CustomerRecord, RawRow, ScoredRecord},
  error::Result,
  normalize::normalize_detailed,
  score::{days_between, score_by_quantiles},
  segment::classify,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Every input to the pipeline apart from the rows themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
  pub columns:    ColumnMapping,
  pub bins:       Bins,
  /// Reference date for recency.
  pub as_of:      NaiveDate,
  pub min_visits: u32,
  pub min_spend:  f64,
}

impl SegmentConfig {
  /// Default mapping, five bins, no thresholds, recency measured from
  /// `as_of`.
  pub fn new(as_of: NaiveDate) -> Self {
    Self {
      columns: ColumnMapping::default(),
      bins: Bins::default(),
      as_of,
      min_visits: 0,
      min_spend: 0.0,
    }
  }
}

impl Default for SegmentConfig {
  /// As [`SegmentConfig::new`] with today's local date.
  fn default() -> Self { Self::new(Local::now().date_naive()) }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// The scored customer set and its summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
  pub as_of:          NaiveDate,
  pub bins:           Bins,
  /// Scored records, in input row order.
  pub records:        Vec<ScoredRecord>,
  pub segment_counts: SegmentCounts,
  pub analytics:      Analytics,
  pub breakdown:      Vec<SegmentBreakdown>,
  /// Input rows dropped during normalisation.
  pub skipped:        usize,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Normalise, score, classify and aggregate `rows`.
pub fn compute_segments(
  rows: &[RawRow],
  config: &SegmentConfig,
) -> Result<SegmentReport> {
  let normalized = normalize_detailed(
    rows,
    &config.columns,
    config.min_visits,
    config.min_spend,
  )?;
  let skipped = normalized.skipped.len();
  let records = score_records(normalized.records, config.bins, config.as_of);
  let aggregates = aggregate(&records);

  tracing::debug!(
    rows = rows.len(),
    scored = records.len(),
    skipped,
    bins = %config.bins,
    as_of = %config.as_of,
    "computed customer segments"
  );

  Ok(SegmentReport {
    as_of: config.as_of,
    bins: config.bins,
    records,
    segment_counts: aggregates.segment_counts,
    analytics: aggregates.analytics,
    breakdown: aggregates.breakdown,
    skipped,
  })
}

/// Attach recency, R/F/M scores and a segment to each customer. The three
/// dimensions are scored independently over the whole set.
pub fn score_records(
  customers: Vec<CustomerRecord>,
  bins: Bins,
  as_of: NaiveDate,
) -> Vec<ScoredRecord> {
  let recency: Vec<u32> = customers
    .iter()
    .map(|c| days_between(c.last_visit, as_of))
    .collect();

  let recency_values: Vec<f64> = recency.iter().copied().map(f64::from).collect();
  let frequency: Vec<f64> = customers.iter().map(|c| f64::from(c.visits)).collect();
  let monetary: Vec<f64> = customers.iter().map(|c| c.spend).collect();

  let r = score_by_quantiles(&recency_values, bins, false);
  let f = score_by_quantiles(&frequency, bins, true);
  let m = score_by_quantiles(&monetary, bins, true);

  customers
    .into_iter()
    .enumerate()
    .map(|(i, customer)| ScoredRecord {
      customer,
      recency_days: recency[i],
      r: r[i],
      f: f[i],
      m: m[i],
      segment: classify(r[i], f[i], m[i], bins),
    })
    .collect()
}
