//! Binary entrypoint: read collector records from stdin, run one analysis
//! pass, write incidents and notifications as JSON lines to stdout.
//!
//! Input is one JSON `NormalizedEvent` per line, or raw log lines with
//! `--syslog`. Invalid JSON lines produce a structured error line and are
//! skipped. Logging goes to stderr (`RUST_LOG` controls the level).
//!
//! Environment:
//!   SIEM_WINDOW_MINUTES    analysis window (default 60)
//!   SIEM_DEDUP             "pair" (default) or "type_window"
//!   SIEM_SUPPRESS_MINUTES  type_window suppression span (default 120)
//!   SIEM_SOURCE_OS         source tag for --syslog input (default "linux")

use std::io::{self, BufRead, Write};

use analysis_engine::types::ErrorOutput;
use analysis_engine::{
  normalize, AnalysisEngine, Config, DedupPolicy, MemoryStore, NormalizedEvent,
};

fn env_i64(name: &str, default: i64) -> i64 {
  std::env::var(name)
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(default)
}

fn config_from_env() -> Config {
  let dedup = match std::env::var("SIEM_DEDUP").as_deref() {
    Ok("type_window") => DedupPolicy::TypeWindow {
      suppress_minutes: env_i64("SIEM_SUPPRESS_MINUTES", 120),
    },
    _ => DedupPolicy::EventPair,
  };

  Config {
    window_minutes: env_i64("SIEM_WINDOW_MINUTES", 60),
    dedup,
    ..Config::default()
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let syslog_mode = std::env::args().any(|a| a == "--syslog");
  let source_os = std::env::var("SIEM_SOURCE_OS").unwrap_or_else(|_| "linux".into());

  let engine = AnalysisEngine::new(config_from_env(), vec![Box::new(analysis_engine::InternalChannel)]);
  let store = MemoryStore::new();

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  let mut batch: Vec<NormalizedEvent> = Vec::new();
  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        let _ = writeln!(io::stderr(), "analysis-engine: read error: {}", e);
        std::process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    if syslog_mode {
      batch.push(normalize::parse_line(trimmed, &source_os));
      continue;
    }

    match serde_json::from_str::<NormalizedEvent>(trimmed) {
      Ok(record) => batch.push(record),
      Err(e) => {
        let err = ErrorOutput::new(format!("json parse: {}", e));
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
      }
    }
  }

  if let Err(e) = engine.ingest(&store, &batch) {
    let _ = writeln!(io::stderr(), "analysis-engine: ingest failed: {}", e);
    std::process::exit(1);
  }

  let report = match engine.run_analysis(&store) {
    Ok(report) => report,
    Err(e) => {
      let _ = writeln!(io::stderr(), "analysis-engine: analysis failed: {}", e);
      std::process::exit(1);
    }
  };

  for incident in &report.incidents {
    let _ = serde_json::to_writer(&mut out, incident);
    let _ = writeln!(out);
  }
  for notification in &report.notifications {
    let _ = serde_json::to_writer(&mut out, notification);
    let _ = writeln!(out);
  }

  let _ = out.flush();
}
