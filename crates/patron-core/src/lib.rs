//! Core types and the RFM segmentation pipeline for Patron.
//!
//! This crate is deliberately free of I/O. CSV decoding, HTTP, and the CLI
//! all live in their own crates and hand this one plain rows and settings.
//!
//! The pipeline runs in five stages:
//!   raw rows + [`ColumnMapping`]
//!     └─ [`normalize`]                → Vec<CustomerRecord>
//!          └─ [`score_by_quantiles`]  → R / F / M per customer
//!               └─ [`classify`]       → Segment
//!                    └─ [`aggregate`] → counts, analytics, breakdown
//!
//! [`compute_segments`] runs all of them in one call.

pub mod aggregate;
pub mod customer;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod score;
pub mod segment;

pub use aggregate::{
  Aggregates, Analytics, SegmentBreakdown, SegmentCounts, SortKey, ViewQuery,
  aggregate, counts_by_size, filter_view,
};
pub use customer::{Bins, ColumnMapping, CustomerRecord, RawRow, ScoredRecord};
pub use error::{Error, Result};
pub use normalize::{SkipReason, SkippedRow, normalize, normalize_detailed};
pub use pipeline::{
  SegmentConfig, SegmentReport, compute_segments, score_records,
};
pub use score::{days_between, score_by_quantiles};
pub use segment::{Segment, classify};
