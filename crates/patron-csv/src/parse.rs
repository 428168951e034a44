//! CSV → raw rows.
//!
//! Every data row becomes a [`RawRow`] keyed by the header names. Cells are
//! trimmed; rows shorter than the header simply lack the trailing columns.
//! Whether a row is usable is decided later by `patron_core::normalize`.

use std::io::Read;

use patron_core::{ColumnMapping, RawRow};

use crate::error::Result;

fn reader<R: Read>(input: R) -> csv::Reader<R> {
  csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(input)
}

/// Header names with any UTF-8 byte-order mark removed from the first one.
fn clean_headers(headers: &csv::StringRecord) -> Vec<String> {
  headers
    .iter()
    .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
    .collect()
}

pub(crate) fn read_rows<R: Read>(input: R) -> Result<Vec<RawRow>> {
  let mut rdr = reader(input);
  let headers = clean_headers(rdr.headers()?);

  let mut rows = Vec::new();
  for record in rdr.records() {
    let record = record?;
    let mut row = RawRow::with_capacity(headers.len());
    for (header, value) in headers.iter().zip(record.iter()) {
      // First occurrence wins when a header repeats.
      row
        .entry(header.clone())
        .or_insert_with(|| value.to_string());
    }
    rows.push(row);
  }

  tracing::debug!(columns = headers.len(), rows = rows.len(), "parsed CSV");
  Ok(rows)
}

pub(crate) fn read_headers<R: Read>(input: R) -> Result<Vec<String>> {
  let mut rdr = reader(input);
  Ok(clean_headers(rdr.headers()?))
}

/// Required mapped columns that `headers` does not contain.
pub(crate) fn missing_columns(
  headers: &[String],
  mapping: &ColumnMapping,
) -> Vec<String> {
  mapping
    .required_columns()
    .into_iter()
    .filter(|col| !headers.iter().any(|h| h == col))
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = "\
id,name,email,phone,last_visit,visits,total_spend
c1, Alice ,alice@example.com,,2024-05-01,4,120.50
c2,Bob,,555-0100,2024-03-15 10:30,2,40
";

  #[test]
  fn reads_rows_keyed_by_header() {
    let rows = read_rows(SAMPLE.as_bytes()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Alice");
    assert_eq!(rows[0]["phone"], "");
    assert_eq!(rows[1]["last_visit"], "2024-03-15 10:30");
    assert_eq!(rows[1]["total_spend"], "40");
  }

  #[test]
  fn short_rows_lack_trailing_columns() {
    let input = "name,last_visit,visits,total_spend\nCara,2024-01-01\n";
    let rows = read_rows(input.as_bytes()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Cara");
    assert!(!rows[0].contains_key("visits"));
  }

  #[test]
  fn byte_order_mark_is_stripped() {
    let input = "\u{feff}name,visits\nDan,3\n";
    let rows = read_rows(input.as_bytes()).unwrap();
    assert_eq!(rows[0]["name"], "Dan");
  }

  #[test]
  fn quoted_fields_keep_commas() {
    let input = "name,total_spend\n\"Smith, Jo\",\"1,200\"\n";
    let rows = read_rows(input.as_bytes()).unwrap();
    assert_eq!(rows[0]["name"], "Smith, Jo");
    assert_eq!(rows[0]["total_spend"], "1,200");
  }

  #[test]
  fn empty_input_has_no_rows() {
    assert!(read_rows("".as_bytes()).unwrap().is_empty());
    assert!(read_headers("".as_bytes()).unwrap().is_empty());
  }

  #[test]
  fn reports_missing_required_columns() {
    let headers = read_headers("name,visits,notes\n".as_bytes()).unwrap();
    let missing = missing_columns(&headers, &ColumnMapping::default());
    assert_eq!(missing, vec!["last_visit", "total_spend"]);
  }

  #[test]
  fn padded_mapping_matches_trimmed_headers() {
    let headers =
      read_headers(" name , last_visit ,visits,total_spend\n".as_bytes())
        .unwrap();
    let mapping = ColumnMapping {
      name: " name ".into(),
      ..ColumnMapping::default()
    };
    assert!(missing_columns(&headers, &mapping).is_empty());
  }
}
