//! `patron` — RFM customer segmentation from the command line.
//!
//! # Usage
//!
//! ```text
//! patron score customers.csv --as-of 2024-06-30 --segment vip
//! patron summary customers.csv --format json
//! patron --config patron.toml serve --port 9000
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the `info` default), so stdout
//! can be piped.

mod output;
mod settings;

use std::{
  fs,
  io::{self, Read, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::Format;
use patron_core::{
  RawRow, Segment, SegmentReport, SortKey, ViewQuery, compute_segments,
  filter_view,
};
use settings::{PipelineArgs, Settings};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "patron", version, about = "RFM customer segmentation")]
struct Args {
  /// Path to a TOML settings file (default: ./patron.toml if present).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Score a CSV export and list customers with their segments.
  Score {
    /// CSV file to read, or `-` for stdin.
    input: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Only customers in this segment (e.g. `vip`, `"at risk"`).
    #[arg(long, value_parser = Segment::parse_label)]
    segment: Option<Segment>,

    /// Case-insensitive substring over name, email, phone and id.
    #[arg(long)]
    search: Option<String>,

    /// spend, visits, recency or name.
    #[arg(long)]
    sort: Option<SortKey>,

    /// Show at most this many customers.
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },

  /// Print headline analytics and the per-segment breakdown.
  Summary {
    /// CSV file to read, or `-` for stdin.
    input: PathBuf,

    #[command(flatten)]
    pipeline: PipelineArgs,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write to this file instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
  },

  /// List segment labels in rule order.
  Labels,

  /// Print the effective settings as TOML.
  Config,

  /// Serve the JSON API.
  Serve {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(io::stderr)
    .init();

  let args = Args::parse();
  let mut settings = Settings::load(args.config.as_deref())?;

  match args.command {
    Command::Score {
      input,
      pipeline,
      segment,
      search,
      sort,
      limit,
      format,
      output: path,
    } => {
      settings.apply(&pipeline);
      let report = run_pipeline(&input, &settings)?;
      let query = ViewQuery {
        segment,
        search,
        sort,
        limit,
      };
      let view = filter_view(&report.records, &query);
      tracing::debug!(
        shown = view.len(),
        total = report.records.len(),
        "filtered view"
      );

      let mut out = open_output(path.as_deref())?;
      output::write_records(&mut *out, &view, format)?;
      out.flush()?;
    }
    Command::Summary {
      input,
      pipeline,
      format,
      output: path,
    } => {
      settings.apply(&pipeline);
      let report = run_pipeline(&input, &settings)?;

      let mut out = open_output(path.as_deref())?;
      output::write_summary(&mut *out, &report, format)?;
      out.flush()?;
    }
    Command::Labels => {
      for segment in Segment::all() {
        println!("{segment}");
      }
    }
    Command::Config => print!("{}", settings.to_toml()?),
    Command::Serve { host, port } => {
      if let Some(host) = host {
        settings.server.host = host;
      }
      if let Some(port) = port {
        settings.server.port = port;
      }
      serve(&settings).await?;
    }
  }

  Ok(())
}

// ─── Commands ─────────────────────────────────────────────────────────────────

fn run_pipeline(input: &Path, settings: &Settings) -> Result<SegmentReport> {
  let text = read_input(input)?;
  let rows: Vec<RawRow> = patron_csv::parse_str(&text)
    .with_context(|| format!("failed to parse {}", input.display()))?;

  let config = settings.segment_config();
  let headers = patron_csv::headers(&text)?;
  let missing = patron_csv::missing_columns(&headers, &config.columns);
  if !rows.is_empty() && !missing.is_empty() {
    tracing::warn!(
      ?missing,
      "input lacks mapped columns; affected rows will be skipped"
    );
  }

  let report = compute_segments(&rows, &config).context("invalid settings")?;
  tracing::info!(
    customers = report.records.len(),
    skipped = report.skipped,
    as_of = %report.as_of,
    "scored customers"
  );
  Ok(report)
}

async fn serve(settings: &Settings) -> Result<()> {
  let state = patron_api::ApiState {
    defaults: settings.segment_defaults(),
  };
  let app = patron_api::api_router(state);
  let address = format!("{}:{}", settings.server.host, settings.server.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

// ─── I/O helpers ──────────────────────────────────────────────────────────────

fn read_input(path: &Path) -> Result<String> {
  if path == Path::new("-") {
    let mut text = String::new();
    io::stdin()
      .read_to_string(&mut text)
      .context("failed to read stdin")?;
    return Ok(text);
  }
  fs::read_to_string(path)
    .with_context(|| format!("failed to read {}", path.display()))
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
  match path {
    Some(p) => {
      let file = fs::File::create(p)
        .with_context(|| format!("failed to create {}", p.display()))?;
      Ok(Box::new(io::BufWriter::new(file)))
    }
    None => Ok(Box::new(io::stdout().lock())),
  }
}
