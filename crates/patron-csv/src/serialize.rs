//! Scored records and segment breakdowns → CSV.
//!
//! A header row is always written, even for an empty input, so an export of
//! an empty working set is still a valid table.

use std::io::Write;

use chrono::NaiveDate;
use patron_core::{ScoredRecord, SegmentBreakdown};
use serde::Serialize;

use crate::error::Result;

pub(crate) const RECORD_HEADER: [&str; 12] = [
  "id",
  "name",
  "email",
  "phone",
  "last_visit",
  "visits",
  "spend",
  "recency_days",
  "r",
  "f",
  "m",
  "segment",
];

pub(crate) const BREAKDOWN_HEADER: [&str; 4] =
  ["segment", "count", "avg_spend", "avg_visits"];

#[derive(Serialize)]
struct RecordRow<'a> {
  id:           &'a str,
  name:         &'a str,
  email:        Option<&'a str>,
  phone:        Option<&'a str>,
  last_visit:   NaiveDate,
  visits:       u32,
  spend:        f64,
  recency_days: u32,
  r:            u8,
  f:            u8,
  m:            u8,
  segment:      &'static str,
}

impl<'a> From<&'a ScoredRecord> for RecordRow<'a> {
  fn from(record: &'a ScoredRecord) -> Self {
    let c = &record.customer;
    Self {
      id:           &c.id,
      name:         &c.name,
      email:        c.email.as_deref(),
      phone:        c.phone.as_deref(),
      last_visit:   c.last_visit,
      visits:       c.visits,
      spend:        c.spend,
      recency_days: record.recency_days,
      r:            record.r,
      f:            record.f,
      m:            record.m,
      segment:      record.segment.label(),
    }
  }
}

#[derive(Serialize)]
struct BreakdownRow {
  segment:    &'static str,
  count:      usize,
  avg_spend:  String,
  avg_visits: String,
}

fn writer<W: Write>(output: W) -> csv::Writer<W> {
  csv::WriterBuilder::new()
    .has_headers(false)
    .from_writer(output)
}

pub(crate) fn write_records<'a, W, I>(output: W, records: I) -> Result<()>
where
  W: Write,
  I: IntoIterator<Item = &'a ScoredRecord>,
{
  let mut wtr = writer(output);
  wtr.write_record(RECORD_HEADER)?;
  for record in records {
    wtr.serialize(RecordRow::from(record))?;
  }
  wtr.flush()?;
  Ok(())
}

pub(crate) fn write_breakdown<W: Write>(
  output: W,
  breakdown: &[SegmentBreakdown],
) -> Result<()> {
  let mut wtr = writer(output);
  wtr.write_record(BREAKDOWN_HEADER)?;
  for b in breakdown {
    wtr.serialize(BreakdownRow {
      segment:    b.segment.label(),
      count:      b.count,
      avg_spend:  format!("{:.2}", b.avg_spend),
      avg_visits: format!("{:.2}", b.avg_visits),
    })?;
  }
  wtr.flush()?;
  Ok(())
}
