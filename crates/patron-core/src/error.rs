//! Error types for `patron-core`.
//!
//! Only caller mistakes end up here. Malformed data rows are filtered out by
//! [`crate::normalize`] and never surface as an `Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("column mapping for required field `{0}` is empty")]
  MissingColumnMapping(&'static str),

  #[error("threshold `{name}` must be a non-negative finite number, got {value}")]
  InvalidThreshold { name: &'static str, value: f64 },

  #[error("unknown segment label: {0:?}")]
  UnknownSegment(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
