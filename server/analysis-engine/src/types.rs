//! Core types for the analysis engine (JSON contracts + internal models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Opaque key-value bag carried alongside events, incidents and notifications.
pub type Details = HashMap<String, Value>;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract — what collectors produce)
// ---------------------------------------------------------------------------

/// One collector record. Unknown fields are silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedEvent {
  /// ISO-8601 timestamp. Unparsable values fall back to "now" at persist time.
  pub ts: String,
  pub source_os: String,
  #[serde(default)]
  pub severity: String,
  pub message: String,
  #[serde(default)]
  pub raw_data: Details,
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Detection severity ladder, totally ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Info,
  Low,
  Medium,
  High,
  Critical,
}

impl Severity {
  pub fn from_str_loose(s: &str) -> Option<Self> {
    match s.to_ascii_lowercase().as_str() {
      "info" | "notice" | "default" => Some(Self::Info),
      "low" | "debug" => Some(Self::Low),
      "medium" => Some(Self::Medium),
      "high" | "error" | "err" => Some(Self::High),
      "critical" | "fatal" | "fault" | "crit" => Some(Self::Critical),
      _ => None,
    }
  }
}

/// Severity label on incidents and notifications.
///
/// Carries the five detection ladder values plus the sibling `warning` tag,
/// which sits outside the ladder: it never participates in ordering or
/// escalation decisions, so this enum deliberately has no `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
  Info,
  Low,
  Medium,
  High,
  Critical,
  Warning,
}

impl AlertSeverity {
  /// Whether delivery to non-internal channels should be attempted.
  pub fn escalates(self) -> bool {
    matches!(self, Self::High | Self::Critical)
  }
}

impl From<Severity> for AlertSeverity {
  fn from(s: Severity) -> Self {
    match s {
      Severity::Info => Self::Info,
      Severity::Low => Self::Low,
      Severity::Medium => Self::Medium,
      Severity::High => Self::High,
      Severity::Critical => Self::Critical,
    }
  }
}

// ---------------------------------------------------------------------------
// Classification taxonomy
// ---------------------------------------------------------------------------

/// Event taxonomy. Assigned exactly once at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
  Authentication,
  Network,
  Service,
  Process,
  System,
}

impl EventType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Authentication => "authentication",
      Self::Network => "network",
      Self::Service => "service",
      Self::Process => "process",
      Self::System => "system",
    }
  }
}

/// Where the record originated. Assigned once at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
  Os,
  Service,
  UserProcess,
}

// ---------------------------------------------------------------------------
// Persisted event
// ---------------------------------------------------------------------------

/// Persisted, classified unit of log activity. Immutable after creation;
/// the core only reads events, never mutates them.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
  pub id: u64,
  pub ts: DateTime<Utc>,
  pub source_os: String,
  pub source_category: SourceCategory,
  pub event_type: EventType,
  pub severity: Severity,
  pub message: String,
  pub raw_data: Details,
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

/// Ephemeral detection result produced by a rule evaluation.
#[derive(Debug, Clone)]
pub struct IncidentCandidate {
  /// Identifier of the rule that produced this candidate.
  pub incident_type: String,
  pub severity: Severity,
  pub description: String,
  /// Window end of the evaluation that produced the candidate.
  pub detected_at: DateTime<Utc>,
  /// Representative event (last matched in result-set order), if any.
  pub event_id: Option<u64>,
  pub details: Details,
}

/// Persisted incident. Immutable after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
  pub id: u64,
  /// Stable hex identifier (`inc-<16 hex>`), comparable across processes.
  pub incident_key: String,
  pub detected_at: DateTime<Utc>,
  pub incident_type: String,
  pub severity: AlertSeverity,
  pub description: String,
  pub event_id: Option<u64>,
  pub details: Details,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
  Incident,
  CriticalEvent,
  Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
  Pending,
  Sent,
  Failed,
}

/// Notification record. Created once per triggering incident/event; status
/// is updated at most once per channel attempt, then immutable.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
  pub id: u64,
  pub created_at: DateTime<Utc>,
  pub notification_type: NotificationType,
  pub severity: AlertSeverity,
  pub title: String,
  pub message: String,
  pub incident_id: Option<u64>,
  pub event_id: Option<u64>,
  pub channel: String,
  pub status: DeliveryStatus,
  pub details: Details,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for invalid input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn severity_ladder_is_ordered() {
    assert!(Severity::Info < Severity::Low);
    assert!(Severity::Low < Severity::Medium);
    assert!(Severity::Medium < Severity::High);
    assert!(Severity::High < Severity::Critical);
  }

  #[test]
  fn loose_severity_parsing() {
    assert_eq!(Severity::from_str_loose("ERROR"), Some(Severity::High));
    assert_eq!(Severity::from_str_loose("fault"), Some(Severity::Critical));
    assert_eq!(Severity::from_str_loose("notice"), Some(Severity::Info));
    assert_eq!(Severity::from_str_loose("warning"), None);
  }

  #[test]
  fn only_high_and_critical_escalate() {
    assert!(AlertSeverity::High.escalates());
    assert!(AlertSeverity::Critical.escalates());
    assert!(!AlertSeverity::Low.escalates());
    assert!(!AlertSeverity::Warning.escalates());
  }
}
