//! CSV codec for Patron.
//!
//! Converts customer exports into [`patron_core::RawRow`]s and scored
//! results back into CSV. Pure synchronous; no HTTP or filesystem access
//! beyond the readers and writers the caller supplies.
//!
//! # Quick start
//!
//! ```no_run
//! use patron_core::{SegmentConfig, compute_segments};
//!
//! let csv = "name,last_visit,visits,total_spend\nAlice,2024-05-01,4,120\n";
//! let rows = patron_csv::parse_str(csv).unwrap();
//! let report = compute_segments(&rows, &SegmentConfig::default()).unwrap();
//! print!("{}", patron_csv::records_to_string(&report.records).unwrap());
//! ```

pub mod error;
mod parse;
mod serialize;

use std::io::{Read, Write};

pub use error::{Error, Result};
use patron_core::{ColumnMapping, RawRow, ScoredRecord, SegmentBreakdown};

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Read a headered CSV table into raw rows.
///
/// Fails only on structural problems (invalid UTF-8, broken quoting). Rows
/// with missing or malformed values are returned as-is; the pipeline drops
/// them later.
pub fn parse_rows<R: Read>(input: R) -> Result<Vec<RawRow>> {
  parse::read_rows(input)
}

/// [`parse_rows`] over an in-memory string.
pub fn parse_str(input: &str) -> Result<Vec<RawRow>> {
  parse::read_rows(input.as_bytes())
}

/// The header row of a CSV table (empty for empty input).
pub fn headers(input: &str) -> Result<Vec<String>> {
  parse::read_headers(input.as_bytes())
}

/// Required columns named by `mapping` that are absent from `headers`.
/// Every row of such a table would be dropped, so callers usually warn.
pub fn missing_columns(headers: &[String], mapping: &ColumnMapping) -> Vec<String> {
  parse::missing_columns(headers, mapping)
}

// ─── Encoding ────────────────────────────────────────────────────────────────

/// Write scored records as CSV with the columns
/// `id,name,email,phone,last_visit,visits,spend,recency_days,r,f,m,segment`.
pub fn write_records<'a, W, I>(output: W, records: I) -> Result<()>
where
  W: Write,
  I: IntoIterator<Item = &'a ScoredRecord>,
{
  serialize::write_records(output, records)
}

/// [`write_records`] into a `String`.
pub fn records_to_string<'a, I>(records: I) -> Result<String>
where
  I: IntoIterator<Item = &'a ScoredRecord>,
{
  let mut buf = Vec::new();
  serialize::write_records(&mut buf, records)?;
  Ok(String::from_utf8(buf)?)
}

/// Write a per-segment breakdown as `segment,count,avg_spend,avg_visits`,
/// with averages rounded to two decimals.
pub fn write_breakdown<W: Write>(
  output: W,
  breakdown: &[SegmentBreakdown],
) -> Result<()> {
  serialize::write_breakdown(output, breakdown)
}

// ─── End-to-end ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod pipeline_tests {
  use chrono::NaiveDate;
  use patron_core::{Segment, SegmentConfig, compute_segments};

  use super::*;

  #[test]
  fn import_score_export() {
    let input = "\
Customer,Email,Last Seen,Orders,Revenue
Alice,alice@example.com,2024-06-29,12,900
Bob,,2024-06-30 08:00,1,40
Cara,cara@example.com,2023-10-01,9,650
Dan,,garbage,3,20
";
    let rows = parse_str(input).unwrap();
    assert_eq!(rows.len(), 4);

    let mut config =
      SegmentConfig::new(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    config.columns = ColumnMapping {
      id:         None,
      name:       "Customer".into(),
      email:      Some("Email".into()),
      phone:      None,
      last_visit: "Last Seen".into(),
      visits:     "Orders".into(),
      spend:      "Revenue".into(),
    };

    let report = compute_segments(&rows, &config).unwrap();
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.skipped, 1);

    let bob = report
      .records
      .iter()
      .find(|r| r.customer.name == "Bob")
      .unwrap();
    assert_eq!(bob.recency_days, 0);
    assert_eq!((bob.r, bob.f, bob.m), (4, 2, 2));
    assert_eq!(bob.segment, Segment::Promising);

    let out = records_to_string(&report.records).unwrap();
    assert_eq!(out.lines().count(), 4);
    assert!(out.lines().any(|l| l.starts_with("Bob,Bob,,,2024-06-30,1,")));
  }

  #[test]
  fn header_check_flags_unmapped_exports() {
    let h = headers("Customer,Orders\n").unwrap();
    let missing = missing_columns(&h, &ColumnMapping::default());
    assert_eq!(missing.len(), 4);
  }
}

// ─── Shared test helpers ─────────────────────────────────────────────────────
