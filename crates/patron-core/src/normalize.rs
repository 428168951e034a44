//! Raw rows → typed customer records.
//!
//! Rows that fail to parse or fall under the configured thresholds are
//! dropped, not reported as errors: real-world exports routinely carry
//! partial rows. [`normalize_detailed`] reports which rows were dropped and
//! why.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{
  customer::{ColumnMapping, CustomerRecord, RawRow},
  error::{Error, Result},
};

// ─── Skip reporting ──────────────────────────────────────────────────────────

/// Why a row was left out of the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  MissingName,
  InvalidDate,
  InvalidVisits,
  InvalidSpend,
  BelowMinVisits,
  BelowMinSpend,
}

/// A dropped row, by zero-based position in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
  pub row:    usize,
  pub reason: SkipReason,
}

/// Output of [`normalize_detailed`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
  pub records: Vec<CustomerRecord>,
  pub skipped: Vec<SkippedRow>,
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Convert `rows` into customer records, keeping only rows that parse and
/// meet `min_visits` / `min_spend`.
///
/// Fails only on caller errors: an empty required column mapping or a
/// negative / non-finite `min_spend`.
pub fn normalize(
  rows: &[RawRow],
  mapping: &ColumnMapping,
  min_visits: u32,
  min_spend: f64,
) -> Result<Vec<CustomerRecord>> {
  normalize_detailed(rows, mapping, min_visits, min_spend).map(|n| n.records)
}

/// Like [`normalize`], but also returns the rows that were dropped.
pub fn normalize_detailed(
  rows: &[RawRow],
  mapping: &ColumnMapping,
  min_visits: u32,
  min_spend: f64,
) -> Result<Normalized> {
  mapping.validate()?;
  if !min_spend.is_finite() || min_spend < 0.0 {
    return Err(Error::InvalidThreshold {
      name:  "min_spend",
      value: min_spend,
    });
  }

  let mut out = Normalized::default();
  for (index, row) in rows.iter().enumerate() {
    match normalize_row(row, mapping, min_visits, min_spend) {
      Ok(record) => out.records.push(record),
      Err(reason) => {
        tracing::debug!(row = index, ?reason, "skipping customer row");
        out.skipped.push(SkippedRow { row: index, reason });
      }
    }
  }
  Ok(out)
}

fn normalize_row(
  row: &RawRow,
  mapping: &ColumnMapping,
  min_visits: u32,
  min_spend: f64,
) -> Result<CustomerRecord, SkipReason> {
  let name = cell(row, mapping.name_column())
    .map(str::to_string)
    .ok_or(SkipReason::MissingName)?;

  let last_visit = cell(row, mapping.last_visit_column())
    .and_then(parse_visit_date)
    .ok_or(SkipReason::InvalidDate)?;

  let visits = cell(row, mapping.visits_column())
    .and_then(parse_count)
    .ok_or(SkipReason::InvalidVisits)?;

  let spend = cell(row, mapping.spend_column())
    .and_then(parse_amount)
    .ok_or(SkipReason::InvalidSpend)?;

  if visits < min_visits {
    return Err(SkipReason::BelowMinVisits);
  }
  if spend < min_spend {
    return Err(SkipReason::BelowMinSpend);
  }

  let id = mapping
    .id_column()
    .and_then(|c| cell(row, c))
    .map(str::to_string)
    .unwrap_or_else(|| name.clone());
  let email = mapping
    .email_column()
    .and_then(|c| cell(row, c))
    .map(str::to_string);
  let phone = mapping
    .phone_column()
    .and_then(|c| cell(row, c))
    .map(str::to_string);

  Ok(CustomerRecord {
    id,
    name,
    email,
    phone,
    last_visit,
    visits,
    spend,
  })
}

/// The trimmed, non-empty value of `column` in `row`.
fn cell<'a>(row: &'a RawRow, column: &str) -> Option<&'a str> {
  row
    .get(column)
    .map(|v| v.trim())
    .filter(|v| !v.is_empty())
}

// ─── Value parsers ───────────────────────────────────────────────────────────

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a visit date from an ISO date, an ISO / RFC 3339 datetime, a US
/// `MM/DD/YYYY` date, or `YYYY-MM-DD HH:MM[:SS]`. Datetimes keep the
/// calendar date they were written with.
pub fn parse_visit_date(value: &str) -> Option<NaiveDate> {
  let value = value.trim();
  if value.is_empty() {
    return None;
  }
  parse_generic_date(value).or_else(|| parse_spaced_datetime(value))
}

fn parse_generic_date(value: &str) -> Option<NaiveDate> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
    return Some(dt.date_naive());
  }
  for fmt in DATETIME_FORMATS {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
      return Some(dt.date());
    }
  }
  DATE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// `YYYY-MM-DD HH:MM` → `YYYY-MM-DDTHH:MM`, then parse as a local datetime.
fn parse_spaced_datetime(value: &str) -> Option<NaiveDate> {
  let (date, time) = value.split_once(' ')?;
  let iso = format!("{}T{}", date.trim(), time.trim());
  DATETIME_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(&iso, fmt).ok())
    .map(|dt| dt.date())
}

/// A directly parseable, finite, non-negative decimal.
pub fn parse_amount(value: &str) -> Option<f64> {
  value
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|n| n.is_finite() && *n >= 0.0)
}

/// A visit count. Fractional counts are floored.
pub fn parse_count(value: &str) -> Option<u32> {
  let n = parse_amount(value)?.floor();
  (n <= f64::from(u32::MAX)).then_some(n as u32)
}

/// Parse a number after stripping display formatting: currency signs,
/// thousands separators, percent signs and whitespace (`"$1,250.50"`,
/// `"12 %"`). Anything else must form a plain decimal, so `"(25)"` and
/// `"1-2"` are rejected rather than read as 25 and 12.
pub fn parse_loose_number(value: &str) -> Option<f64> {
  let cleaned: String = value
    .chars()
    .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
    .collect();
  cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
