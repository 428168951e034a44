//! Segment labels and the ordered rule table that assigns them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator};

use crate::{
  customer::Bins,
  error::{Error, Result},
};

/// A behavioural customer segment.
///
/// Variants are declared in rule order, so `Ord` sorts by classification
/// priority.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Segment {
  #[serde(rename = "VIP")]
  #[strum(serialize = "VIP")]
  Vip,
  Loyal,
  #[serde(rename = "Big Spender")]
  #[strum(serialize = "Big Spender", serialize = "big_spender")]
  BigSpender,
  New,
  Promising,
  #[serde(rename = "At Risk")]
  #[strum(serialize = "At Risk", serialize = "at_risk")]
  AtRisk,
  Lapsed,
  Hibernating,
}

impl Segment {
  /// Every segment, in rule order.
  pub fn all() -> impl Iterator<Item = Segment> { Self::iter() }

  /// Display label; also the serialised form.
  pub fn label(self) -> &'static str {
    match self {
      Self::Vip => "VIP",
      Self::Loyal => "Loyal",
      Self::BigSpender => "Big Spender",
      Self::New => "New",
      Self::Promising => "Promising",
      Self::AtRisk => "At Risk",
      Self::Lapsed => "Lapsed",
      Self::Hibernating => "Hibernating",
    }
  }

  /// Parse a label, case-insensitively. Snake-case aliases
  /// (`big_spender`, `at_risk`) are accepted for command-line use.
  pub fn parse_label(s: &str) -> Result<Self> {
    Segment::from_str(s.trim())
      .map_err(|_| Error::UnknownSegment(s.to_string()))
  }
}

impl std::fmt::Display for Segment {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.label())
  }
}

/// Assign a segment from R/F/M scores. First matching rule wins:
///
/// | # | Condition                          | Segment     |
/// |---|------------------------------------|-------------|
/// | 1 | R ≥ high, F ≥ high, M ≥ high       | VIP         |
/// | 2 | R ≥ high, F = top                  | Loyal       |
/// | 3 | M = top, F ≥ high                  | Big Spender |
/// | 4 | R = top, F ≤ 2                     | New         |
/// | 5 | R ≥ high, F ≤ 2                    | Promising   |
/// | 6 | R ≤ 2, F ≥ high                    | At Risk     |
/// | 7 | R = 1                              | Lapsed      |
/// | 8 | otherwise                          | Hibernating |
///
/// with `high = max(4, bins - 1)` and `top = bins`. With three bins `high`
/// exceeds `top`, which leaves rules 1, 2, 3, 5 and 6 unreachable.
pub fn classify(r: u8, f: u8, m: u8, bins: Bins) -> Segment {
  let top = bins.get();
  let high = 4u8.max(top - 1);

  if r >= high && f >= high && m >= high {
    Segment::Vip
  } else if r >= high && f == top {
    Segment::Loyal
  } else if m == top && f >= high {
    Segment::BigSpender
  } else if r == top && f <= 2 {
    Segment::New
  } else if r >= high && f <= 2 {
    Segment::Promising
  } else if r <= 2 && f >= high {
    Segment::AtRisk
  } else if r == 1 {
    Segment::Lapsed
  } else {
    Segment::Hibernating
  }
}
