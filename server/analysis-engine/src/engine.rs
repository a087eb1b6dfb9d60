//! Top-level orchestrator: ingest batches, run analysis passes.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::config::Config;
use crate::dedup::Deduplicator;
use crate::error::EngineError;
use crate::normalize;
use crate::notify::{Channel, NotificationDispatcher};
use crate::rules::RuleEngine;
use crate::store::{event_signature, Store};
use crate::types::{Event, Incident, IncidentCandidate, Notification, NormalizedEvent, Severity};

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
  pub collected: usize,
  pub stored: usize,
  pub critical_notifications: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
  pub incidents: Vec<Incident>,
  pub notifications: Vec<Notification>,
}

/// Composes RuleEngine → Deduplicator → persistence → NotificationDispatcher.
///
/// Persistence happens before any channel delivery; a failed store call
/// aborts the run, a failed delivery never does.
pub struct AnalysisEngine {
  config: Config,
  rules: RuleEngine,
  dedup: Deduplicator,
  dispatcher: NotificationDispatcher,
}

impl AnalysisEngine {
  pub fn new(config: Config, channels: Vec<Box<dyn Channel>>) -> Self {
    let rules = RuleEngine::new(config.rules.clone());
    let dedup = Deduplicator::new(config.dedup.clone());
    Self {
      config,
      rules,
      dedup,
      dispatcher: NotificationDispatcher::new(channels),
    }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default(), vec![Box::new(crate::notify::InternalChannel)])
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Persist a collector batch, dropping records whose signature
  /// (second-truncated ts, message, source_os) is already stored, then
  /// dispatch one notification per newly stored critical event.
  pub fn ingest<S: Store>(
    &self,
    store: &S,
    batch: &[NormalizedEvent],
  ) -> Result<IngestReport, EngineError> {
    if batch.is_empty() {
      return Ok(IngestReport {
        collected: 0,
        stored: 0,
        critical_notifications: 0,
      });
    }

    let events: Vec<Event> = batch.iter().map(normalize::to_event).collect();

    // Signature query spans the batch, end-exclusive.
    let min_ts = events.iter().map(|e| e.ts).min().unwrap_or_else(Utc::now);
    let max_ts = events.iter().map(|e| e.ts).max().unwrap_or_else(Utc::now);
    let mut seen = store.existing_signatures(min_ts, max_ts + Duration::seconds(1))?;

    let fresh: Vec<Event> = events
      .into_iter()
      .filter(|e| seen.insert(event_signature(e)))
      .collect();

    let stored = store.add_events(&fresh)?;

    let mut critical_notifications = 0;
    for event in &stored {
      if event.severity == Severity::Critical
        && self.dispatcher.notify_critical_event(store, event)?.is_some()
      {
        critical_notifications += 1;
      }
    }

    info!(
      collected = batch.len(),
      stored = stored.len(),
      critical_notifications,
      "ingest complete"
    );

    Ok(IngestReport {
      collected: batch.len(),
      stored: stored.len(),
      critical_notifications,
    })
  }

  /// One analysis pass over the trailing window ending now.
  pub fn run_analysis<S: Store>(&self, store: &S) -> Result<AnalysisReport, EngineError> {
    let until = Utc::now();
    let since = until - Duration::minutes(self.config.window_minutes);
    self.run_analysis_between(store, since, until)
  }

  /// One analysis pass over an explicit window `[since, until)`.
  pub fn run_analysis_between<S: Store>(
    &self,
    store: &S,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<AnalysisReport, EngineError> {
    let candidates = self.rules.run(store, since, until)?;
    let fresh = self.dedup.filter(store, candidates, until)?;

    if fresh.is_empty() {
      info!(%since, %until, "analysis pass found nothing new");
      return Ok(AnalysisReport {
        incidents: Vec::new(),
        notifications: Vec::new(),
      });
    }

    // Representative events for detail enrichment.
    let mut event_ids: Vec<u64> = fresh.iter().filter_map(|c| c.event_id).collect();
    event_ids.sort_unstable();
    event_ids.dedup();
    let event_by_id: HashMap<u64, Event> = store
      .events_by_id(&event_ids)?
      .into_iter()
      .map(|e| (e.id, e))
      .collect();

    let incidents: Vec<Incident> = fresh
      .into_iter()
      .map(|c| {
        let event = c.event_id.and_then(|id| event_by_id.get(&id));
        to_incident(c, event)
      })
      .collect();

    let stored = store.add_incidents(&incidents)?;

    let mut notifications = Vec::with_capacity(stored.len());
    for incident in &stored {
      notifications.push(self.dispatcher.notify_incident(store, incident)?);
    }

    info!(
      incidents = stored.len(),
      notifications = notifications.len(),
      %since,
      %until,
      "analysis pass complete"
    );

    Ok(AnalysisReport {
      incidents: stored,
      notifications,
    })
  }
}

/// Stable incident key: rule type + detection minute + representative event.
fn incident_key(candidate: &IncidentCandidate) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(candidate.incident_type.as_bytes());
  hasher.update(b"|");
  hasher.update(
    candidate
      .detected_at
      .format("%Y-%m-%dT%H:%M")
      .to_string()
      .as_bytes(),
  );
  if let Some(id) = candidate.event_id {
    hasher.update(b"|");
    hasher.update(&id.to_le_bytes());
  }
  let hex = hasher.finalize().to_hex();
  format!("inc-{}", &hex[..16])
}

/// Promote a candidate to a persistable incident, copying best-effort
/// process/service names from the representative event's raw fields.
fn to_incident(candidate: IncidentCandidate, event: Option<&Event>) -> Incident {
  let mut details = candidate.details.clone();
  if let Some(event) = event {
    for key in ["process", "service", "application"] {
      if let Some(value) = event.raw_data.get(key).and_then(|v| v.as_str()) {
        if !value.is_empty() {
          details.entry(key.to_string()).or_insert_with(|| value.into());
        }
      }
    }
  }

  Incident {
    id: 0,
    incident_key: incident_key(&candidate),
    detected_at: candidate.detected_at,
    incident_type: candidate.incident_type,
    severity: candidate.severity.into(),
    description: candidate.description,
    event_id: candidate.event_id,
    details,
  }
}
