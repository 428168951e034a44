//! Customer records: the raw input shape, the column mapping that reads it,
//! and the typed records the pipeline produces.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  segment::Segment,
};

// ─── Raw input ───────────────────────────────────────────────────────────────

/// One row of an imported table, keyed by source column name.
pub type RawRow = HashMap<String, String>;

// ─── Column mapping ──────────────────────────────────────────────────────────

/// Source column names for each customer field.
///
/// `name`, `last_visit`, `visits` and `spend` are required. The optional
/// columns may be `None` or an empty string, which both mean "not mapped".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
  pub id:         Option<String>,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub last_visit: String,
  pub visits:     String,
  pub spend:      String,
}

impl Default for ColumnMapping {
  fn default() -> Self {
    Self {
      id:         Some("id".to_string()),
      name:       "name".to_string(),
      email:      Some("email".to_string()),
      phone:      Some("phone".to_string()),
      last_visit: "last_visit".to_string(),
      visits:     "visits".to_string(),
      spend:      "total_spend".to_string(),
    }
  }
}

impl ColumnMapping {
  /// Reject mappings that leave a required field without a source column.
  pub fn validate(&self) -> Result<()> {
    let required = [
      ("name", &self.name),
      ("last_visit", &self.last_visit),
      ("visits", &self.visits),
      ("spend", &self.spend),
    ];
    for (field, column) in required {
      if column.trim().is_empty() {
        return Err(Error::MissingColumnMapping(field));
      }
    }
    Ok(())
  }

  /// The required source columns, trimmed, in field order.
  pub fn required_columns(&self) -> [&str; 4] {
    [
      self.name_column(),
      self.last_visit_column(),
      self.visits_column(),
      self.spend_column(),
    ]
  }

  pub fn name_column(&self) -> &str { self.name.trim() }

  pub fn last_visit_column(&self) -> &str { self.last_visit.trim() }

  pub fn visits_column(&self) -> &str { self.visits.trim() }

  pub fn spend_column(&self) -> &str { self.spend.trim() }

  pub fn id_column(&self) -> Option<&str> { mapped(&self.id) }

  pub fn email_column(&self) -> Option<&str> { mapped(&self.email) }

  pub fn phone_column(&self) -> Option<&str> { mapped(&self.phone) }
}

fn mapped(column: &Option<String>) -> Option<&str> {
  column.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

// ─── Bins ────────────────────────────────────────────────────────────────────

/// Number of score levels per dimension. Always within
/// [`Bins::MIN`]`..=`[`Bins::MAX`]; out-of-range inputs are clamped.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
#[serde(from = "u8", into = "u8")]
pub struct Bins(u8);

impl Bins {
  pub const MIN: u8 = 3;
  pub const MAX: u8 = 7;

  pub fn new(n: u8) -> Self { Self(n.clamp(Self::MIN, Self::MAX)) }

  pub fn get(self) -> u8 { self.0 }
}

impl Default for Bins {
  fn default() -> Self { Self(5) }
}

impl From<u8> for Bins {
  fn from(n: u8) -> Self { Self::new(n) }
}

impl From<Bins> for u8 {
  fn from(bins: Bins) -> Self { bins.0 }
}

impl std::fmt::Display for Bins {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.0.fmt(f)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A customer row that survived normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
  /// The mapped id, or the name when no id is available. Not unique.
  pub id:         String,
  pub name:       String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub last_visit: NaiveDate,
  pub visits:     u32,
  pub spend:      f64,
}

/// A [`CustomerRecord`] with its RFM scores and segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
  #[serde(flatten)]
  pub customer:     CustomerRecord,
  pub recency_days: u32,
  pub r:            u8,
  pub f:            u8,
  pub m:            u8,
  pub segment:      Segment,
}
