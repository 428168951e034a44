//! Summaries over a scored customer set, and the filtered working view.

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::{customer::ScoredRecord, segment::Segment};

/// Customers seen within this many days count as active.
pub const ACTIVE_WINDOW_DAYS: u32 = 90;
/// Customers unseen for longer than this many days count as churned.
pub const CHURN_WINDOW_DAYS: u32 = 180;

/// Customers per segment. Only segments with at least one member appear.
pub type SegmentCounts = BTreeMap<Segment, usize>;

// ─── Output types ────────────────────────────────────────────────────────────

/// Headline numbers for a scored customer set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Analytics {
  pub total_customers:   usize,
  /// Last visit within [`ACTIVE_WINDOW_DAYS`].
  pub active_customers:  usize,
  pub at_risk_customers: usize,
  /// Mean spend per customer.
  pub lifetime_value:    f64,
  /// Percentage (0–100) of customers unseen for over [`CHURN_WINDOW_DAYS`].
  pub churn_rate:        f64,
}

/// Size and averages of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBreakdown {
  pub segment:    Segment,
  pub count:      usize,
  pub avg_spend:  f64,
  pub avg_visits: f64,
}

/// Everything [`aggregate`] derives from a scored set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregates {
  pub segment_counts: SegmentCounts,
  pub analytics:      Analytics,
  /// One entry per non-empty segment, in [`counts_by_size`] order.
  pub breakdown:      Vec<SegmentBreakdown>,
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Group `scored` by segment and compute the summary analytics. An empty
/// input yields zeroes throughout.
pub fn aggregate(scored: &[ScoredRecord]) -> Aggregates {
  let segment_counts = segment_counts(scored);
  let analytics = analytics(scored);

  let breakdown = counts_by_size(&segment_counts)
    .into_iter()
    .map(|(segment, count)| {
      let members = scored.iter().filter(|r| r.segment == segment);
      let (spend, visits) = members.fold((0.0, 0.0), |(s, v), r| {
        (s + r.customer.spend, v + f64::from(r.customer.visits))
      });
      SegmentBreakdown {
        segment,
        count,
        avg_spend: mean(spend, count),
        avg_visits: mean(visits, count),
      }
    })
    .collect();

  Aggregates {
    segment_counts,
    analytics,
    breakdown,
  }
}

pub fn segment_counts(scored: &[ScoredRecord]) -> SegmentCounts {
  let mut counts = SegmentCounts::new();
  for record in scored {
    *counts.entry(record.segment).or_default() += 1;
  }
  counts
}

pub fn analytics(scored: &[ScoredRecord]) -> Analytics {
  let total = scored.len();
  let active = scored
    .iter()
    .filter(|r| r.recency_days <= ACTIVE_WINDOW_DAYS)
    .count();
  let at_risk = scored
    .iter()
    .filter(|r| r.segment == Segment::AtRisk)
    .count();
  let churned = scored
    .iter()
    .filter(|r| r.recency_days > CHURN_WINDOW_DAYS)
    .count();
  let spend: f64 = scored.iter().map(|r| r.customer.spend).sum();

  Analytics {
    total_customers:   total,
    active_customers:  active,
    at_risk_customers: at_risk,
    lifetime_value:    mean(spend, total),
    churn_rate:        mean(100.0 * churned as f64, total),
  }
}

/// Segment counts for display: largest first, ties in rule order.
pub fn counts_by_size(counts: &SegmentCounts) -> Vec<(Segment, usize)> {
  let mut sized: Vec<_> = counts.iter().map(|(s, c)| (*s, *c)).collect();
  sized.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
  sized
}

fn mean(sum: f64, count: usize) -> f64 {
  if count == 0 { 0.0 } else { sum / count as f64 }
}

// ─── Working view ────────────────────────────────────────────────────────────

/// Ordering for [`filter_view`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SortKey {
  /// Highest spend first.
  Spend,
  /// Most visits first.
  Visits,
  /// Most recent visit first.
  Recency,
  /// Alphabetical, case-insensitive.
  Name,
}

/// Filters for the working view. Every field is optional; an empty query
/// returns all records in their original order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewQuery {
  pub segment: Option<Segment>,
  /// Case-insensitive substring over name, email, phone and id.
  pub search:  Option<String>,
  pub sort:    Option<SortKey>,
  pub limit:   Option<usize>,
}

/// Select the records matching `query`.
pub fn filter_view<'a>(
  records: &'a [ScoredRecord],
  query: &ViewQuery,
) -> Vec<&'a ScoredRecord> {
  let needle = query
    .search
    .as_deref()
    .map(|s| s.trim().to_lowercase())
    .filter(|s| !s.is_empty());

  let mut view: Vec<&ScoredRecord> = records
    .iter()
    .filter(|r| query.segment.is_none_or(|s| r.segment == s))
    .filter(|r| needle.as_deref().is_none_or(|n| matches_search(r, n)))
    .collect();

  if let Some(key) = query.sort {
    view.sort_by(|a, b| compare(a, b, key));
  }
  if let Some(limit) = query.limit {
    view.truncate(limit);
  }
  view
}

fn matches_search(record: &ScoredRecord, needle: &str) -> bool {
  let c = &record.customer;
  [
    Some(c.name.as_str()),
    c.email.as_deref(),
    c.phone.as_deref(),
    Some(c.id.as_str()),
  ]
  .into_iter()
  .flatten()
  .any(|field| field.to_lowercase().contains(needle))
}

fn compare(a: &ScoredRecord, b: &ScoredRecord, key: SortKey) -> Ordering {
  match key {
    SortKey::Spend => b.customer.spend.total_cmp(&a.customer.spend),
    SortKey::Visits => b.customer.visits.cmp(&a.customer.visits),
    SortKey::Recency => a.recency_days.cmp(&b.recency_days),
    SortKey::Name => a
      .customer
      .name
      .to_lowercase()
      .cmp(&b.customer.name.to_lowercase()),
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::customer::CustomerRecord;

  fn scored(
    name: &str,
    recency_days: u32,
    visits: u32,
    spend: f64,
    segment: Segment,
  ) -> ScoredRecord {
    ScoredRecord {
      customer: CustomerRecord {
        id: name.to_lowercase(),
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        phone: None,
        last_visit: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        visits,
        spend,
      },
      recency_days,
      r: 3,
      f: 3,
      m: 3,
      segment,
    }
  }

  fn sample() -> Vec<ScoredRecord> {
    vec![
      scored("Ada", 5, 12, 900.0, Segment::Vip),
      scored("Ben", 30, 2, 60.0, Segment::New),
      scored("Cy", 120, 8, 400.0, Segment::AtRisk),
      scored("Dee", 200, 1, 20.0, Segment::Lapsed),
      scored("Eve", 95, 9, 500.0, Segment::AtRisk),
    ]
  }

  #[test]
  fn empty_set_yields_zeroes() {
    let agg = aggregate(&[]);
    assert!(agg.segment_counts.is_empty());
    assert!(agg.breakdown.is_empty());
    assert_eq!(agg.analytics, Analytics::default());
  }

  #[test]
  fn analytics_over_sample() {
    let a = analytics(&sample());
    assert_eq!(a.total_customers, 5);
    assert_eq!(a.active_customers, 2);
    assert_eq!(a.at_risk_customers, 2);
    assert!((a.lifetime_value - 376.0).abs() < 1e-9);
    assert!((a.churn_rate - 20.0).abs() < 1e-9);
  }

  #[test]
  fn recency_boundaries_are_inclusive_and_exclusive() {
    let records = vec![
      scored("A", 90, 1, 1.0, Segment::Hibernating),
      scored("B", 180, 1, 1.0, Segment::Hibernating),
      scored("C", 181, 1, 1.0, Segment::Hibernating),
    ];
    let a = analytics(&records);
    assert_eq!(a.active_customers, 1);
    assert!((a.churn_rate - 100.0 / 3.0).abs() < 1e-9);
  }

  #[test]
  fn breakdown_is_sorted_by_size_with_averages() {
    let agg = aggregate(&sample());
    assert_eq!(agg.segment_counts[&Segment::AtRisk], 2);
    assert_eq!(agg.breakdown[0].segment, Segment::AtRisk);
    assert_eq!(agg.breakdown[0].count, 2);
    assert!((agg.breakdown[0].avg_spend - 450.0).abs() < 1e-9);
    assert!((agg.breakdown[0].avg_visits - 8.5).abs() < 1e-9);
    // Singletons follow in rule order.
    let rest: Vec<_> = agg.breakdown[1..].iter().map(|b| b.segment).collect();
    assert_eq!(rest, vec![Segment::Vip, Segment::New, Segment::Lapsed]);
  }

  #[test]
  fn view_filters_by_segment_and_search() {
    let records = sample();
    let at_risk = filter_view(&records, &ViewQuery {
      segment: Some(Segment::AtRisk),
      ..ViewQuery::default()
    });
    assert_eq!(at_risk.len(), 2);

    let by_email = filter_view(&records, &ViewQuery {
      search: Some("  BEN@EXAMPLE ".into()),
      ..ViewQuery::default()
    });
    assert_eq!(by_email.len(), 1);
    assert_eq!(by_email[0].customer.name, "Ben");

    let none = filter_view(&records, &ViewQuery {
      segment: Some(Segment::Vip),
      search: Some("eve".into()),
      ..ViewQuery::default()
    });
    assert!(none.is_empty());
  }

  #[test]
  fn empty_query_returns_everything_in_order() {
    let records = sample();
    let view = filter_view(&records, &ViewQuery::default());
    let names: Vec<_> = view.iter().map(|r| r.customer.name.as_str()).collect();
    assert_eq!(names, vec!["Ada", "Ben", "Cy", "Dee", "Eve"]);
  }

  #[test]
  fn view_sorts_and_limits() {
    let records = sample();
    let top_spenders = filter_view(&records, &ViewQuery {
      sort: Some(SortKey::Spend),
      limit: Some(2),
      ..ViewQuery::default()
    });
    let names: Vec<_> =
      top_spenders.iter().map(|r| r.customer.name.as_str()).collect();
    assert_eq!(names, vec!["Ada", "Eve"]);

    let freshest = filter_view(&records, &ViewQuery {
      sort: Some(SortKey::Recency),
      ..ViewQuery::default()
    });
    assert_eq!(freshest[0].customer.name, "Ada");
    assert_eq!(freshest[4].customer.name, "Dee");
  }

  #[test]
  fn visits_sort_descending_and_keeps_ties_in_order() {
    let mut records = sample();
    records.insert(3, scored("Fay", 40, 8, 10.0, Segment::Hibernating));
    let view = filter_view(&records, &ViewQuery {
      sort: Some(SortKey::Visits),
      ..ViewQuery::default()
    });
    let names: Vec<_> = view.iter().map(|r| r.customer.name.as_str()).collect();
    assert_eq!(names, vec!["Ada", "Eve", "Cy", "Fay", "Ben", "Dee"]);
  }

  #[test]
  fn name_sort_ignores_case_and_is_stable() {
    let records = vec![
      scored("carl", 1, 1, 1.0, Segment::New),
      scored("bob", 2, 1, 1.0, Segment::New),
      scored("Alice", 3, 1, 1.0, Segment::New),
      scored("Bob", 4, 1, 1.0, Segment::New),
    ];
    let view = filter_view(&records, &ViewQuery {
      sort: Some(SortKey::Name),
      ..ViewQuery::default()
    });
    let order: Vec<_> = view.iter().map(|r| r.recency_days).collect();
    assert_eq!(order, vec![3, 2, 4, 1]);
  }

  #[test]
  fn sort_key_parses_from_snake_case() {
    use std::str::FromStr;
    assert_eq!(SortKey::from_str("spend").unwrap(), SortKey::Spend);
    assert_eq!(SortKey::from_str("Recency").unwrap(), SortKey::Recency);
    assert!(SortKey::from_str("age").is_err());
  }
}
