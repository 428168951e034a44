//! Percentile-rank scoring of one RFM dimension.

use chrono::NaiveDate;

use crate::customer::Bins;

/// Score every value in `values` into `1..=bins` by its position in the
/// sorted distribution. Output order matches input order.
///
/// For each value `x`, `p` is the fraction of values `<= x` and the raw
/// score is `floor(p * bins) + 1`, clamped to `bins`. When
/// `higher_is_better` is false the score is mirrored (`bins - raw + 1`), so
/// the smallest values score highest.
///
/// Tied values always share a score, but there is no tie averaging: the
/// score of a tie depends on how many values sit at or below it. If every
/// value is identical each one scores `bins` (or 1 when inverted).
pub fn score_by_quantiles(
  values: &[f64],
  bins: Bins,
  higher_is_better: bool,
) -> Vec<u8> {
  if values.is_empty() {
    return Vec::new();
  }

  let mut ranks = values.to_vec();
  ranks.sort_by(f64::total_cmp);

  let n = ranks.len();
  let top = usize::from(bins.get());

  values
    .iter()
    .map(|&x| {
      // Index of the first rank strictly greater than `x`.
      let idx = ranks.partition_point(|&r| r <= x);
      // floor(idx / n * bins), computed without rounding error.
      let raw = (idx * top / n + 1).clamp(1, top) as u8;
      if higher_is_better { raw } else { bins.get() - raw + 1 }
    })
    .collect()
}

/// Whole days from `from` to `to`, or 0 if `from` is later than `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> u32 {
  let days = to.signed_duration_since(from).num_days().max(0);
  u32::try_from(days).unwrap_or(u32::MAX)
}
