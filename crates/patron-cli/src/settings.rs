//! Layered settings: optional TOML file, then `PATRON_*` environment
//! variables, then command-line flags.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `PATRON_COLUMNS__SPEND=revenue` or `PATRON_SERVER__PORT=9000`.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use config::{Config, Environment, File, Source};
use patron_api::SegmentDefaults;
use patron_core::{Bins, ColumnMapping, SegmentConfig};
use serde::{Deserialize, Serialize};

/// Read when `--config` is not given; silently skipped if absent.
pub const DEFAULT_CONFIG_FILE: &str = "patron.toml";

// ─── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub bins:       Bins,
  pub min_visits: u32,
  pub min_spend:  f64,
  /// Reference date for recency. Today when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub as_of:      Option<NaiveDate>,
  pub columns:    ColumnMapping,
  pub server:     ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
  pub host: String,
  pub port: u16,
}

impl Default for ServerSettings {
  fn default() -> Self {
    Self {
      host: "127.0.0.1".to_string(),
      port: 8080,
    }
  }
}

impl Settings {
  /// Load from `path` (required) or [`DEFAULT_CONFIG_FILE`] (optional),
  /// then the process environment.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let file = match path {
      Some(p) => File::from(p).required(true),
      None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
    };
    Self::build(file, environment())
  }

  fn build<F, E>(file: F, env: E) -> Result<Self>
  where
    F: Source + Send + Sync + 'static,
    E: Source + Send + Sync + 'static,
  {
    Config::builder()
      .add_source(file)
      .add_source(env)
      .build()
      .context("failed to read settings")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  /// Apply command-line overrides.
  pub fn apply(&mut self, args: &PipelineArgs) {
    if let Some(as_of) = args.as_of {
      self.as_of = Some(as_of);
    }
    if let Some(bins) = args.bins {
      self.bins = Bins::new(bins);
    }
    if let Some(min_visits) = args.min_visits {
      self.min_visits = min_visits;
    }
    if let Some(min_spend) = args.min_spend {
      self.min_spend = min_spend;
    }
  }

  pub fn segment_config(&self) -> SegmentConfig {
    SegmentConfig {
      columns:    self.columns.clone(),
      bins:       self.bins,
      as_of:      self.as_of.unwrap_or_else(|| Local::now().date_naive()),
      min_visits: self.min_visits,
      min_spend:  self.min_spend,
    }
  }

  pub fn segment_defaults(&self) -> SegmentDefaults {
    SegmentDefaults {
      columns:    self.columns.clone(),
      bins:       self.bins,
      min_visits: self.min_visits,
      min_spend:  self.min_spend,
    }
  }

  pub fn to_toml(&self) -> Result<String> {
    toml::to_string_pretty(self).context("failed to render settings")
  }
}

fn environment() -> Environment {
  Environment::with_prefix("PATRON")
    .prefix_separator("_")
    .separator("__")
}

// ─── Command-line overrides ──────────────────────────────────────────────────

/// Pipeline flags shared by `score` and `summary`.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
  /// Reference date for recency (YYYY-MM-DD). Defaults to today.
  #[arg(long, value_name = "DATE")]
  pub as_of: Option<NaiveDate>,

  /// Score levels per dimension (3–7).
  #[arg(long, value_parser = clap::value_parser!(u8).range(3..=7))]
  pub bins: Option<u8>,

  /// Drop customers with fewer visits.
  #[arg(long, value_name = "N")]
  pub min_visits: Option<u32>,

  /// Drop customers who spent less. Accepts `$1,250.50`-style amounts.
  #[arg(long, value_name = "AMOUNT", value_parser = parse_spend)]
  pub min_spend: Option<f64>,
}

fn parse_spend(value: &str) -> Result<f64, String> {
  patron_core::normalize::parse_loose_number(value)
    .filter(|n| *n >= 0.0)
    .ok_or_else(|| format!("`{value}` is not a non-negative amount"))
}
