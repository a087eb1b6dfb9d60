//! Integration tests for the analysis engine.

use analysis_engine::types::{AlertSeverity, DeliveryStatus, Details, NotificationType};
use analysis_engine::{AnalysisEngine, Config, DedupPolicy, MemoryStore, NormalizedEvent};
use chrono::{DateTime, TimeZone, Utc};

fn ts(min: u32, sec: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 1, 16, 12, min, sec).unwrap()
}

fn record(min: u32, sec: u32, severity: &str, message: &str) -> NormalizedEvent {
  NormalizedEvent {
    ts: ts(min, sec).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    source_os: "linux".into(),
    severity: severity.into(),
    message: message.into(),
    raw_data: Details::new(),
  }
}

fn network_error_batch(count: usize) -> Vec<NormalizedEvent> {
  (0..count)
    .map(|i| {
      record(
        (i / 60) as u32,
        (i % 60) as u32,
        "medium",
        &format!("Network timeout while connecting to host {}", i),
      )
    })
    .collect()
}

#[test]
fn twelve_network_errors_yield_one_low_incident_and_one_notification() {
  let engine = AnalysisEngine::with_defaults();
  let store = MemoryStore::new();

  engine.ingest(&store, &network_error_batch(12)).unwrap();
  let report = engine.run_analysis_between(&store, ts(0, 0), ts(10, 0)).unwrap();

  assert_eq!(report.incidents.len(), 1);
  let incident = &report.incidents[0];
  assert_eq!(incident.incident_type, "repeated_network_errors");
  // count=12 falls in the 10-49 bucket.
  assert_eq!(incident.severity, AlertSeverity::Low);
  assert_eq!(incident.details["count"], 12);
  assert_eq!(incident.detected_at, ts(10, 0));

  // Severity below high: no external escalation attempted, internal record only.
  assert_eq!(report.notifications.len(), 1);
  let notification = &report.notifications[0];
  assert_eq!(notification.notification_type, NotificationType::Incident);
  assert_eq!(notification.status, DeliveryStatus::Pending);
  assert_eq!(notification.channel, "internal");
  assert_eq!(notification.incident_id, Some(incident.id));
}

#[test]
fn nine_network_errors_stay_below_threshold() {
  let engine = AnalysisEngine::with_defaults();
  let store = MemoryStore::new();

  engine.ingest(&store, &network_error_batch(9)).unwrap();
  let report = engine.run_analysis_between(&store, ts(0, 0), ts(10, 0)).unwrap();

  assert!(report.incidents.is_empty());
  assert!(report.notifications.is_empty());
}

#[test]
fn pair_dedup_across_overlapping_runs() {
  let engine = AnalysisEngine::with_defaults();
  let store = MemoryStore::new();

  engine.ingest(&store, &network_error_batch(12)).unwrap();

  // Two overlapping windows: the same representative event triggers the
  // same rule twice, but only the first run persists an incident.
  let first = engine.run_analysis_between(&store, ts(0, 0), ts(10, 0)).unwrap();
  let second = engine.run_analysis_between(&store, ts(0, 0), ts(15, 0)).unwrap();

  assert_eq!(first.incidents.len(), 1);
  assert!(second.incidents.is_empty());
  assert!(second.notifications.is_empty());
  assert_eq!(store.incidents().len(), 1);
}

#[test]
fn type_window_dedup_suppresses_repeat_incident_types() {
  let config = Config {
    dedup: DedupPolicy::TypeWindow { suppress_minutes: 120 },
    ..Config::default()
  };
  let engine = AnalysisEngine::new(config, vec![Box::new(analysis_engine::InternalChannel)]);
  let store = MemoryStore::new();

  engine.ingest(&store, &network_error_batch(12)).unwrap();
  let first = engine.run_analysis_between(&store, ts(0, 0), ts(10, 0)).unwrap();
  assert_eq!(first.incidents.len(), 1);

  // Fresh matching events arrive, but the incident type is inside the
  // suppression window: only the first detection is persisted.
  let more: Vec<NormalizedEvent> = (0..12)
    .map(|i| record(20, i as u32, "medium", &format!("DNS lookup failed for host {}", i)))
    .collect();
  engine.ingest(&store, &more).unwrap();
  let second = engine.run_analysis_between(&store, ts(15, 0), ts(25, 0)).unwrap();

  assert!(second.incidents.is_empty());
  assert_eq!(store.incidents().len(), 1);
}

#[test]
fn syslog_batch_end_to_end() {
  let engine = AnalysisEngine::with_defaults();
  let store = MemoryStore::new();

  let year = Utc::now().format("%Y").to_string();
  let batch: Vec<NormalizedEvent> = (0..12)
    .map(|i| {
      analysis_engine::normalize::parse_line(
        &format!("Jan 16 12:00:{:02} host nginx[123]: connection refused by upstream {}", i, i),
        "linux",
      )
    })
    .collect();

  assert!(batch[0].ts.starts_with(&year));
  engine.ingest(&store, &batch).unwrap();

  let since = analysis_engine::normalize::parse_ts(&format!("{}-01-16T11:55:00Z", year));
  let until = analysis_engine::normalize::parse_ts(&format!("{}-01-16T12:05:00Z", year));
  let report = engine.run_analysis_between(&store, since, until).unwrap();

  assert_eq!(report.incidents.len(), 1);
  let incident = &report.incidents[0];
  assert_eq!(incident.incident_type, "repeated_network_errors");
  // Representative-event enrichment picked up the syslog process name.
  assert_eq!(incident.details["process"], "nginx");
}

#[test]
fn critical_event_notified_at_ingest_not_analysis() {
  let engine = AnalysisEngine::with_defaults();
  let store = MemoryStore::new();

  let report = engine
    .ingest(&store, &[record(0, 0, "critical", "Memory pressure critical, compressor exhausted")])
    .unwrap();
  assert_eq!(report.critical_notifications, 1);

  let analysis = engine.run_analysis_between(&store, ts(0, 0), ts(10, 0)).unwrap();
  assert!(analysis.incidents.is_empty());

  let notifications = store.notifications();
  assert_eq!(notifications.len(), 1);
  assert_eq!(notifications[0].notification_type, NotificationType::CriticalEvent);
  assert_eq!(notifications[0].severity, AlertSeverity::Critical);
  // No external channel configured: the record stays on the internal channel.
  assert_eq!(notifications[0].status, DeliveryStatus::Pending);
  assert_eq!(notifications[0].channel, "internal");
}

#[test]
fn failed_login_burst_is_critical() {
  let engine = AnalysisEngine::with_defaults();
  let store = MemoryStore::new();

  let batch: Vec<NormalizedEvent> = (0..6)
    .map(|i| record(1, i as u32, "high", &format!("Failed login attempt {} for user admin", i)))
    .collect();
  engine.ingest(&store, &batch).unwrap();

  let report = engine.run_analysis_between(&store, ts(0, 0), ts(10, 0)).unwrap();
  assert_eq!(report.incidents.len(), 1);
  let incident = &report.incidents[0];
  assert_eq!(incident.incident_type, "multiple_failed_logins");
  // Fixed-severity policy: critical regardless of count.
  assert_eq!(incident.severity, AlertSeverity::Critical);
}

#[test]
fn unknown_json_fields_are_ignored() {
  let json = r#"{
    "ts": "2026-01-16T12:00:00Z",
    "source_os": "macos",
    "severity": "low",
    "message": "Service nginx crashed",
    "raw_data": {"process": "nginx"},
    "some_unknown_field": "ignored",
    "another": 42
  }"#;

  let record: NormalizedEvent = serde_json::from_str(json).unwrap();
  let engine = AnalysisEngine::with_defaults();
  let store = MemoryStore::new();
  let report = engine.ingest(&store, &[record]).unwrap();
  assert_eq!(report.stored, 1);
}
