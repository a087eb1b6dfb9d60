//! Detection rules: declarative descriptors interpreted by one evaluator.
//!
//! A rule is data — keyword set, optional event-type pre-filter, threshold,
//! severity policy — plus the single `evaluate` behavior. Evaluation never
//! raises on malformed events; a miss yields zero candidates, not an error.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::debug;

use crate::error::EngineError;
use crate::store::EventStore;
use crate::types::{Details, Event, EventType, IncidentCandidate, Severity};

/// How a matched count maps to a severity.
#[derive(Debug, Clone)]
pub enum SeverityPolicy {
  /// Ordered breakpoint table, highest minimum first. Counts below every
  /// breakpoint fall back to the rule's base severity.
  Breakpoints(Vec<(usize, Severity)>),
  /// Any match at or above the threshold gets this severity, unconditionally.
  Fixed(Severity),
}

impl SeverityPolicy {
  fn severity_for(&self, count: usize, base: Severity) -> Severity {
    match self {
      Self::Fixed(severity) => *severity,
      Self::Breakpoints(table) => table
        .iter()
        .find(|(min, _)| count >= *min)
        .map(|(_, severity)| *severity)
        .unwrap_or(base),
    }
  }
}

/// One configured detection heuristic.
#[derive(Debug, Clone)]
pub struct RuleSpec {
  /// Stable identifier; becomes the incident type of emitted candidates.
  pub name: String,
  /// Human prefix for candidate descriptions.
  pub summary: String,
  /// Pre-filter on the store query. `None` scans all event types — the
  /// deliberately looser net used by the crash-rule variant.
  pub event_type: Option<EventType>,
  /// Matched against the lower-cased message.
  pub keywords: Vec<String>,
  /// Minimum matched count required to emit a candidate.
  pub threshold: usize,
  /// Nominal analysis window, recorded in candidate details.
  pub window_minutes: i64,
  pub base_severity: Severity,
  pub policy: SeverityPolicy,
}

impl RuleSpec {
  fn matches(&self, event: &Event) -> bool {
    let msg = event.message.to_lowercase();
    self.keywords.iter().any(|k| msg.contains(k.as_str()))
  }

  /// Scan `[since, until)` and emit at most one candidate (not one per
  /// matched event), referencing the last matched event in result-set order.
  pub fn evaluate(
    &self,
    store: &dyn EventStore,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<IncidentCandidate>, EngineError> {
    let events = store.events_in_window(since, until, self.event_type)?;
    let matched: Vec<&Event> = events.iter().filter(|e| self.matches(e)).collect();

    let count = matched.len();
    debug!(rule = %self.name, scanned = events.len(), matched = count, "rule evaluated");
    if count < self.threshold {
      return Ok(Vec::new());
    }

    let severity = self.policy.severity_for(count, self.base_severity);
    let description = format!(
      "{}: {} events within last {} minutes.",
      self.summary,
      count,
      (until - since).num_minutes()
    );

    let mut details = Details::new();
    details.insert("count".into(), json!(count));
    details.insert("threshold".into(), json!(self.threshold));
    details.insert("window_minutes".into(), json!(self.window_minutes));
    details.insert("since".into(), json!(since.to_rfc3339()));
    details.insert("until".into(), json!(until.to_rfc3339()));
    details.insert("keywords".into(), json!(self.keywords));

    Ok(vec![IncidentCandidate {
      incident_type: self.name.clone(),
      severity,
      description,
      detected_at: until,
      event_id: matched.last().map(|e| e.id),
      details,
    }])
  }
}

/// Runs every configured rule over a window and concatenates candidates in
/// configured rule order. Rules are independent; no cross-rule interaction.
pub struct RuleEngine {
  rules: Vec<RuleSpec>,
}

impl RuleEngine {
  pub fn new(rules: Vec<RuleSpec>) -> Self {
    Self { rules }
  }

  pub fn rules(&self) -> &[RuleSpec] {
    &self.rules
  }

  pub fn run(
    &self,
    store: &dyn EventStore,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<IncidentCandidate>, EngineError> {
    let mut candidates = Vec::new();
    for rule in &self.rules {
      candidates.extend(rule.evaluate(store, since, until)?);
    }
    Ok(candidates)
  }
}

fn keywords(words: &[&str]) -> Vec<String> {
  words.iter().map(|w| w.to_string()).collect()
}

/// The stock rule set.
pub fn default_rules() -> Vec<RuleSpec> {
  vec![
    RuleSpec {
      name: "multiple_failed_logins".into(),
      summary: "Multiple failed login attempts detected".into(),
      event_type: Some(EventType::Authentication),
      keywords: keywords(&["failed", "failure", "invalid", "denied", "incorrect"]),
      threshold: 5,
      window_minutes: 10,
      base_severity: Severity::Critical,
      // Brute-force indicators are treated as critical at any volume.
      policy: SeverityPolicy::Fixed(Severity::Critical),
    },
    RuleSpec {
      name: "repeated_network_errors".into(),
      summary: "Repeated network-related errors detected".into(),
      event_type: Some(EventType::Network),
      keywords: keywords(&[
        "error",
        "failed",
        "refused",
        "timeout",
        "timed out",
        "unreachable",
        "socket",
      ]),
      threshold: 10,
      window_minutes: 10,
      base_severity: Severity::Low,
      policy: SeverityPolicy::Breakpoints(vec![
        (200, Severity::Critical),
        (100, Severity::High),
        (50, Severity::Medium),
        (10, Severity::Low),
      ]),
    },
    RuleSpec {
      name: "service_crash_or_restart".into(),
      summary: "Service crash/restart indicators detected".into(),
      event_type: Some(EventType::Service),
      keywords: keywords(&["crash", "terminated", "panic", "exited", "restart"]),
      threshold: 1,
      window_minutes: 60,
      base_severity: Severity::Low,
      policy: SeverityPolicy::Breakpoints(vec![
        (100, Severity::Critical),
        (50, Severity::High),
        (10, Severity::Medium),
        (3, Severity::Low),
      ]),
    },
  ]
}
