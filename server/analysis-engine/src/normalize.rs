//! Normalize raw log lines and collector records into canonical events.
//!
//! Timestamp parsing never fails: anything unparsable falls back to "now"
//! and the record is kept rather than dropped.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

use crate::classify;
use crate::types::{Details, Event, NormalizedEvent, Severity};

fn iso_line_pattern() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<ts>\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\s+(?P<msg>.*)$",
    )
    .expect("valid iso line pattern")
  })
}

fn syslog_line_pattern() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(?P<mon>[A-Z][a-z]{2})\s+(?P<day>\d{1,2})\s+(?P<time>\d{2}:\d{2}:\d{2})\s+(?P<host>\S+)\s+(?P<msg>.*)$",
    )
    .expect("valid syslog line pattern")
  })
}

fn process_prefix_pattern() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^(?P<proc>[A-Za-z0-9_./-]+)\[(?P<pid>\d+)\]:\s*(?P<rest>.*)$")
      .expect("valid process prefix pattern")
  })
}

/// Parse an ISO-8601-ish timestamp to UTC. Naive timestamps are taken as
/// already-UTC; unparsable input falls back to now.
pub fn parse_ts(ts: &str) -> DateTime<Utc> {
  let cleaned = ts.trim().replace(',', ".");

  if let Ok(parsed) = DateTime::parse_from_rfc3339(&cleaned) {
    return parsed.with_timezone(&Utc);
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
      return Utc.from_utc_datetime(&naive);
    }
  }

  Utc::now()
}

/// Resolve a syslog month/day/time (no year) against the current year.
fn syslog_ts(mon: &str, day: u32, time: &str) -> DateTime<Utc> {
  let month = match mon {
    "Jan" => 1,
    "Feb" => 2,
    "Mar" => 3,
    "Apr" => 4,
    "May" => 5,
    "Jun" => 6,
    "Jul" => 7,
    "Aug" => 8,
    "Sep" => 9,
    "Oct" => 10,
    "Nov" => 11,
    "Dec" => 12,
    _ => return Utc::now(),
  };

  let mut parts = time.split(':').filter_map(|p| p.parse::<u32>().ok());
  let (hour, minute, second) = match (parts.next(), parts.next(), parts.next()) {
    (Some(h), Some(m), Some(s)) => (h, m, s),
    _ => return Utc::now(),
  };

  Utc
    .with_ymd_and_hms(Utc::now().year(), month, day, hour, minute, second)
    .single()
    .unwrap_or_else(Utc::now)
}

/// Strip a leading severity token (`ERROR zoom[1]: ...`) if present.
fn split_severity_token(msg: &str) -> (Option<Severity>, &str) {
  let mut it = msg.splitn(2, char::is_whitespace);
  let head = it.next().unwrap_or("");
  let severity = match head.to_ascii_lowercase().as_str() {
    "critical" | "fatal" => Some(Severity::Critical),
    "error" => Some(Severity::High),
    "warning" | "warn" => Some(Severity::Medium),
    "info" => Some(Severity::Info),
    "debug" => Some(Severity::Low),
    _ => None,
  };
  match severity {
    Some(s) => (Some(s), it.next().unwrap_or("").trim_start()),
    None => (None, msg),
  }
}

/// Parse one raw log line into a `NormalizedEvent`.
///
/// Supported formats (best-effort):
/// - ISO: `2026-01-16T12:34:56Z message` (also `2026-01-16 12:34:56,000 ...`)
/// - syslog-like: `Jan 16 12:34:56 hostname process[pid]: message`
///
/// Anything else keeps the whole line as the message, timestamped "now".
pub fn parse_line(line: &str, source_os: &str) -> NormalizedEvent {
  let mut raw: Details = Details::new();
  raw.insert("source".into(), json!("file"));
  raw.insert("raw_line".into(), json!(line));

  let (ts, remainder) = if let Some(caps) = iso_line_pattern().captures(line) {
    (parse_ts(&caps["ts"]), caps["msg"].to_string())
  } else if let Some(caps) = syslog_line_pattern().captures(line) {
    let day = caps["day"].parse::<u32>().unwrap_or(1);
    raw.insert("host".into(), json!(&caps["host"]));
    (syslog_ts(&caps["mon"], day, &caps["time"]), caps["msg"].to_string())
  } else {
    (Utc::now(), line.to_string())
  };

  let (severity, remainder) = split_severity_token(&remainder);

  let message = match process_prefix_pattern().captures(remainder) {
    Some(caps) => {
      raw.insert("process".into(), json!(&caps["proc"]));
      raw.insert("pid".into(), json!(caps["pid"].parse::<u64>().unwrap_or(0)));
      caps["rest"].to_string()
    }
    None => remainder.to_string(),
  };

  NormalizedEvent {
    ts: ts.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    source_os: source_os.to_string(),
    severity: match severity {
      Some(Severity::Critical) => "critical".into(),
      Some(Severity::High) => "high".into(),
      Some(Severity::Medium) => "medium".into(),
      Some(Severity::Info) => "info".into(),
      _ => "low".into(),
    },
    message,
    raw_data: raw,
  }
}

/// Classify a collector record into a persistable `Event` (id assigned by
/// the store). Event type and source category are fixed here, once.
pub fn to_event(n: &NormalizedEvent) -> Event {
  let ts = parse_ts(&n.ts);
  let severity = Severity::from_str_loose(&n.severity).unwrap_or(Severity::Low);
  let event_type = classify::classify_event_type(&n.message, &n.raw_data);
  let source_category = classify::classify_source_category(&n.message, &n.raw_data, &n.source_os);

  Event {
    id: 0,
    ts,
    source_os: n.source_os.clone(),
    source_category,
    event_type,
    severity,
    message: n.message.clone(),
    raw_data: n.raw_data.clone(),
  }
}
