//! Storage contracts and the in-memory reference store.
//!
//! The concrete storage engine is an external collaborator; the core only
//! depends on these traits. `MemoryStore` backs the CLI and the tests, and
//! doubles as the reference semantics for real backends: in particular it
//! enforces the `(event_id, incident_type)` uniqueness constraint inside
//! `add_incidents`, which is what keeps two overlapping analysis runs from
//! both inserting the same incident.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::EngineError;
use crate::types::{Event, EventType, Incident, Notification};

/// Ingestion-dedup signature: (second-truncated unix ts, message, source_os).
pub type Signature = (i64, String, String);

pub fn event_signature(event: &Event) -> Signature {
  (
    event.ts.timestamp(),
    event.message.clone(),
    event.source_os.clone(),
  )
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

pub trait EventStore: Send + Sync {
  /// Persist a batch, assigning ids. Returns the stored rows.
  fn add_events(&self, events: &[Event]) -> Result<Vec<Event>, EngineError>;

  /// Signatures of events already stored in `[since, until)`, used by the
  /// collector-side ingestion dedup step.
  fn existing_signatures(
    &self,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<HashSet<Signature>, EngineError>;

  /// Events with `ts` in the half-open window `[since, until)`, optionally
  /// pre-filtered by event type, ordered by `(ts, id)`.
  fn events_in_window(
    &self,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    event_type: Option<EventType>,
  ) -> Result<Vec<Event>, EngineError>;

  /// Look up events by id (for representative-event enrichment).
  fn events_by_id(&self, ids: &[u64]) -> Result<Vec<Event>, EngineError>;
}

pub trait IncidentStore: Send + Sync {
  /// Persist a batch, assigning ids. Rows violating the
  /// `(event_id, incident_type)` uniqueness constraint are dropped.
  /// Returns the rows actually stored.
  fn add_incidents(&self, incidents: &[Incident]) -> Result<Vec<Incident>, EngineError>;

  /// `(event_id, incident_type)` pairs already persisted for these events.
  fn existing_event_type_pairs(
    &self,
    event_ids: &[u64],
  ) -> Result<HashSet<(u64, String)>, EngineError>;

  /// Incident types persisted with `detected_at >= since`.
  fn recent_incident_types(&self, since: DateTime<Utc>) -> Result<HashSet<String>, EngineError>;
}

pub trait NotificationStore: Send + Sync {
  /// Persist one notification, assigning its id. Returns the stored row.
  fn add_notification(&self, notification: Notification) -> Result<Notification, EngineError>;

  fn add_notifications(&self, notifications: &[Notification]) -> Result<usize, EngineError>;

  /// Record the delivery outcome for a previously stored notification.
  /// Called at most once per notification.
  fn update_notification(&self, notification: &Notification) -> Result<(), EngineError>;
}

/// The full persistence surface the orchestrator needs.
pub trait Store: EventStore + IncidentStore + NotificationStore {}

impl<T: EventStore + IncidentStore + NotificationStore> Store for T {}

// ---------------------------------------------------------------------------
// In-memory reference implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStoreInner {
  events: Vec<Event>,
  incidents: Vec<Incident>,
  incident_pairs: HashSet<(u64, String)>,
  notifications: Vec<Notification>,
  next_event_id: u64,
  next_incident_id: u64,
  next_notification_id: u64,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self, op: &str) -> Result<std::sync::MutexGuard<'_, MemoryStoreInner>, EngineError> {
    self
      .inner
      .lock()
      .map_err(|_| EngineError::store(op, "store mutex poisoned"))
  }

  /// Snapshot accessors for the CLI and tests.
  pub fn events(&self) -> Vec<Event> {
    self.inner.lock().map(|g| g.events.clone()).unwrap_or_default()
  }

  pub fn incidents(&self) -> Vec<Incident> {
    self.inner.lock().map(|g| g.incidents.clone()).unwrap_or_default()
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self
      .inner
      .lock()
      .map(|g| g.notifications.clone())
      .unwrap_or_default()
  }
}

impl EventStore for MemoryStore {
  fn add_events(&self, events: &[Event]) -> Result<Vec<Event>, EngineError> {
    let mut inner = self.lock("add_events")?;
    let mut stored = Vec::with_capacity(events.len());
    for event in events {
      inner.next_event_id += 1;
      let mut event = event.clone();
      event.id = inner.next_event_id;
      inner.events.push(event.clone());
      stored.push(event);
    }
    Ok(stored)
  }

  fn existing_signatures(
    &self,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<HashSet<Signature>, EngineError> {
    let inner = self.lock("existing_signatures")?;
    Ok(
      inner
        .events
        .iter()
        .filter(|e| e.ts >= since && e.ts < until)
        .map(event_signature)
        .collect(),
    )
  }

  fn events_in_window(
    &self,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    event_type: Option<EventType>,
  ) -> Result<Vec<Event>, EngineError> {
    let inner = self.lock("events_in_window")?;
    let mut events: Vec<Event> = inner
      .events
      .iter()
      .filter(|e| e.ts >= since && e.ts < until)
      .filter(|e| event_type.map_or(true, |t| e.event_type == t))
      .cloned()
      .collect();
    events.sort_by(|a, b| a.ts.cmp(&b.ts).then(a.id.cmp(&b.id)));
    Ok(events)
  }

  fn events_by_id(&self, ids: &[u64]) -> Result<Vec<Event>, EngineError> {
    let inner = self.lock("events_by_id")?;
    Ok(
      inner
        .events
        .iter()
        .filter(|e| ids.contains(&e.id))
        .cloned()
        .collect(),
    )
  }
}

impl IncidentStore for MemoryStore {
  fn add_incidents(&self, incidents: &[Incident]) -> Result<Vec<Incident>, EngineError> {
    let mut inner = self.lock("add_incidents")?;
    let mut stored = Vec::with_capacity(incidents.len());
    for incident in incidents {
      if let Some(event_id) = incident.event_id {
        let pair = (event_id, incident.incident_type.clone());
        if !inner.incident_pairs.insert(pair) {
          // Uniqueness constraint: another run already persisted this pair.
          continue;
        }
      }
      inner.next_incident_id += 1;
      let mut incident = incident.clone();
      incident.id = inner.next_incident_id;
      inner.incidents.push(incident.clone());
      stored.push(incident);
    }
    Ok(stored)
  }

  fn existing_event_type_pairs(
    &self,
    event_ids: &[u64],
  ) -> Result<HashSet<(u64, String)>, EngineError> {
    let inner = self.lock("existing_event_type_pairs")?;
    Ok(
      inner
        .incident_pairs
        .iter()
        .filter(|(id, _)| event_ids.contains(id))
        .cloned()
        .collect(),
    )
  }

  fn recent_incident_types(&self, since: DateTime<Utc>) -> Result<HashSet<String>, EngineError> {
    let inner = self.lock("recent_incident_types")?;
    Ok(
      inner
        .incidents
        .iter()
        .filter(|i| i.detected_at >= since)
        .map(|i| i.incident_type.clone())
        .collect(),
    )
  }
}

impl NotificationStore for MemoryStore {
  fn add_notification(&self, notification: Notification) -> Result<Notification, EngineError> {
    let mut inner = self.lock("add_notification")?;
    inner.next_notification_id += 1;
    let mut notification = notification;
    notification.id = inner.next_notification_id;
    inner.notifications.push(notification.clone());
    Ok(notification)
  }

  fn add_notifications(&self, notifications: &[Notification]) -> Result<usize, EngineError> {
    for n in notifications {
      self.add_notification(n.clone())?;
    }
    Ok(notifications.len())
  }

  fn update_notification(&self, notification: &Notification) -> Result<(), EngineError> {
    let mut inner = self.lock("update_notification")?;
    match inner.notifications.iter_mut().find(|n| n.id == notification.id) {
      Some(slot) => {
        *slot = notification.clone();
        Ok(())
      }
      None => Err(EngineError::store(
        "update_notification",
        format!("unknown notification id {}", notification.id),
      )),
    }
  }
}
