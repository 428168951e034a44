//! Rendering of scored records and reports for the terminal, JSON, and CSV.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use patron_core::{ScoredRecord, SegmentReport, counts_by_size};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
  /// Aligned plain-text columns.
  #[default]
  Table,
  Json,
  Csv,
}

// ─── Records ──────────────────────────────────────────────────────────────────

const RECORD_COLUMNS: [&str; 8] =
  ["NAME", "SEGMENT", "R", "F", "M", "DAYS", "VISITS", "SPEND"];

pub fn write_records(
  out: &mut dyn Write,
  records: &[&ScoredRecord],
  format: Format,
) -> Result<()> {
  match format {
    Format::Table => {
      let rows = records
        .iter()
        .map(|r| {
          vec![
            r.customer.name.clone(),
            r.segment.to_string(),
            r.r.to_string(),
            r.f.to_string(),
            r.m.to_string(),
            r.recency_days.to_string(),
            r.customer.visits.to_string(),
            format!("{:.2}", r.customer.spend),
          ]
        })
        .collect::<Vec<_>>();
      write_table(out, &RECORD_COLUMNS, &rows)?;
    }
    Format::Json => {
      serde_json::to_writer_pretty(&mut *out, records)?;
      writeln!(out)?;
    }
    Format::Csv => patron_csv::write_records(out, records.iter().copied())?,
  }
  Ok(())
}

// ─── Summary ──────────────────────────────────────────────────────────────────

pub fn write_summary(
  out: &mut dyn Write,
  report: &SegmentReport,
  format: Format,
) -> Result<()> {
  match format {
    Format::Table => {
      let a = &report.analytics;
      writeln!(out, "As of:            {}", report.as_of)?;
      writeln!(out, "Bins:             {}", report.bins)?;
      writeln!(out, "Customers:        {}", a.total_customers)?;
      writeln!(out, "Active (90d):     {}", a.active_customers)?;
      writeln!(out, "At risk:          {}", a.at_risk_customers)?;
      writeln!(out, "Lifetime value:   {:.2}", a.lifetime_value)?;
      writeln!(out, "Churn rate:       {:.1}%", a.churn_rate)?;
      writeln!(out, "Skipped rows:     {}", report.skipped)?;
      writeln!(out)?;

      let rows = report
        .breakdown
        .iter()
        .map(|b| {
          vec![
            b.segment.to_string(),
            b.count.to_string(),
            format!("{:.2}", b.avg_spend),
            format!("{:.2}", b.avg_visits),
          ]
        })
        .collect::<Vec<_>>();
      write_table(out, &["SEGMENT", "COUNT", "AVG SPEND", "AVG VISITS"], &rows)?;
    }
    Format::Json => {
      let counts: Vec<_> = counts_by_size(&report.segment_counts)
        .into_iter()
        .map(|(segment, count)| json!({ "segment": segment, "count": count }))
        .collect();
      let summary = json!({
        "as_of":          report.as_of,
        "bins":           report.bins,
        "analytics":      report.analytics,
        "segment_counts": counts,
        "breakdown":      report.breakdown,
        "skipped":        report.skipped,
      });
      serde_json::to_writer_pretty(&mut *out, &summary)?;
      writeln!(out)?;
    }
    Format::Csv => patron_csv::write_breakdown(out, &report.breakdown)?,
  }
  Ok(())
}

// ─── Table layout ─────────────────────────────────────────────────────────────

fn write_table(
  out: &mut dyn Write,
  headers: &[&str],
  rows: &[Vec<String>],
) -> Result<()> {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (w, cell) in widths.iter_mut().zip(row) {
      *w = (*w).max(cell.chars().count());
    }
  }

  let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
  write_row(out, &header, &widths)?;
  for row in rows {
    write_row(out, row, &widths)?;
  }
  Ok(())
}

fn write_row(out: &mut dyn Write, cells: &[String], widths: &[usize]) -> Result<()> {
  let line = cells
    .iter()
    .zip(widths)
    .map(|(cell, w)| format!("{cell:<w$}"))
    .collect::<Vec<_>>()
    .join("  ");
  writeln!(out, "{}", line.trim_end())?;
  Ok(())
}
