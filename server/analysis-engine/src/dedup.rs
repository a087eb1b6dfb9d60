//! Incident deduplication across overlapping analysis runs.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::EngineError;
use crate::store::IncidentStore;
use crate::types::IncidentCandidate;

/// Suppression policy applied before candidates are persisted.
///
/// The store additionally enforces `(event_id, incident_type)` uniqueness at
/// insert time, so two overlapping runs cannot both insert the same pair
/// even if they both pass this filter.
#[derive(Debug, Clone)]
pub enum DedupPolicy {
  /// Skip candidates whose `(event_id, incident_type)` pair is already
  /// persisted. Candidates without a representative event always pass.
  EventPair,
  /// Skip candidates whose incident type was persisted within the trailing
  /// suppression window before the analysis window end.
  TypeWindow { suppress_minutes: i64 },
}

impl Default for DedupPolicy {
  fn default() -> Self {
    Self::EventPair
  }
}

pub struct Deduplicator {
  policy: DedupPolicy,
}

impl Deduplicator {
  pub fn new(policy: DedupPolicy) -> Self {
    Self { policy }
  }

  /// Drop candidates suppressed by the configured policy.
  pub fn filter(
    &self,
    store: &dyn IncidentStore,
    candidates: Vec<IncidentCandidate>,
    until: DateTime<Utc>,
  ) -> Result<Vec<IncidentCandidate>, EngineError> {
    if candidates.is_empty() {
      return Ok(candidates);
    }

    let before = candidates.len();
    let kept = match &self.policy {
      DedupPolicy::EventPair => {
        let event_ids: Vec<u64> = candidates.iter().filter_map(|c| c.event_id).collect();
        let existing = store.existing_event_type_pairs(&event_ids)?;
        candidates
          .into_iter()
          .filter(|c| match c.event_id {
            None => true,
            Some(id) => !existing.contains(&(id, c.incident_type.clone())),
          })
          .collect::<Vec<_>>()
      }
      DedupPolicy::TypeWindow { suppress_minutes } => {
        let since = until - Duration::minutes(*suppress_minutes);
        let recent = store.recent_incident_types(since)?;
        candidates
          .into_iter()
          .filter(|c| !recent.contains(&c.incident_type))
          .collect::<Vec<_>>()
      }
    };

    if kept.len() < before {
      debug!(suppressed = before - kept.len(), "deduplicator dropped candidates");
    }
    Ok(kept)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{IncidentStore, MemoryStore};
  use crate::types::{AlertSeverity, Details, Incident, Severity};
  use chrono::TimeZone;

  fn ts(min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 16, 12, min, 0).unwrap()
  }

  fn candidate(event_id: Option<u64>, incident_type: &str, detected_at: DateTime<Utc>) -> IncidentCandidate {
    IncidentCandidate {
      incident_type: incident_type.into(),
      severity: Severity::Low,
      description: "test".into(),
      detected_at,
      event_id,
      details: Details::new(),
    }
  }

  fn persisted(store: &MemoryStore, event_id: Option<u64>, incident_type: &str, detected_at: DateTime<Utc>) {
    store
      .add_incidents(&[Incident {
        id: 0,
        incident_key: "inc-test".into(),
        detected_at,
        incident_type: incident_type.into(),
        severity: AlertSeverity::Low,
        description: "test".into(),
        event_id,
        details: Details::new(),
      }])
      .unwrap();
  }

  #[test]
  fn pair_policy_skips_known_pairs_only() {
    let store = MemoryStore::new();
    persisted(&store, Some(3), "repeated_network_errors", ts(10));

    let dedup = Deduplicator::new(DedupPolicy::EventPair);
    let kept = dedup
      .filter(
        &store,
        vec![
          candidate(Some(3), "repeated_network_errors", ts(20)),
          candidate(Some(3), "service_crash_or_restart", ts(20)),
          candidate(None, "repeated_network_errors", ts(20)),
        ],
        ts(20),
      )
      .unwrap();

    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|c| {
      c.event_id.is_none() || c.incident_type != "repeated_network_errors"
    }));
  }

  #[test]
  fn type_window_policy_suppresses_recent_types() {
    let store = MemoryStore::new();
    persisted(&store, Some(1), "repeated_network_errors", ts(10));

    let dedup = Deduplicator::new(DedupPolicy::TypeWindow { suppress_minutes: 30 });
    let kept = dedup
      .filter(
        &store,
        vec![
          candidate(Some(2), "repeated_network_errors", ts(20)),
          candidate(Some(2), "service_crash_or_restart", ts(20)),
        ],
        ts(20),
      )
      .unwrap();

    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].incident_type, "service_crash_or_restart");
  }

  #[test]
  fn type_window_expires_outside_suppression() {
    let store = MemoryStore::new();
    persisted(&store, Some(1), "repeated_network_errors", ts(0));

    let dedup = Deduplicator::new(DedupPolicy::TypeWindow { suppress_minutes: 5 });
    let kept = dedup
      .filter(&store, vec![candidate(Some(2), "repeated_network_errors", ts(20))], ts(20))
      .unwrap();
    assert_eq!(kept.len(), 1);
  }
}
