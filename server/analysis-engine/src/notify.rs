//! Notification dispatch: channel contract, escalation state machine and
//! deterministic title/message templating.
//!
//! Delivery failures are recorded on the notification and never propagate —
//! incident detection must not fail because a channel is down.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::store::NotificationStore;
use crate::types::{
  AlertSeverity, Details, DeliveryStatus, Event, Incident, Notification, NotificationType,
  Severity,
};

/// Explicit outcome of a channel send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
  Delivered,
  Failed(String),
}

/// A pluggable delivery mechanism.
///
/// Implementations must not panic: failures are reported through the
/// returned outcome. Network-backed channels are expected to bound their
/// own send timeout (seconds-scale) — a hung channel would otherwise stall
/// the whole dispatch pass.
pub trait Channel: Send + Sync {
  fn send(&self, title: &str, message: &str, severity: AlertSeverity, details: &Details)
    -> DeliveryOutcome;

  fn name(&self) -> &str;
}

/// Record-only channel: the stored notification itself is the delivery.
/// Always succeeds and never moves the status away from its outcome.
pub struct InternalChannel;

impl Channel for InternalChannel {
  fn send(&self, _: &str, _: &str, _: AlertSeverity, _: &Details) -> DeliveryOutcome {
    DeliveryOutcome::Delivered
  }

  fn name(&self) -> &str {
    "internal"
  }
}

// ---------------------------------------------------------------------------
// Templating (pure)
// ---------------------------------------------------------------------------

/// Per-type message cascade with a generic severity fallback.
pub fn incident_message(incident: &Incident) -> String {
  let count = incident.details.get("count").and_then(|v| v.as_u64());

  let base = match incident.incident_type.as_str() {
    "multiple_failed_logins" => match count {
      Some(c) => format!("Multiple failed authentication attempts: {} events in a short period.", c),
      None => "Multiple failed authentication attempts.".to_string(),
    },
    "repeated_network_errors" => match count {
      Some(c) => format!("Repeated network errors: {} failures in the analyzed window.", c),
      None => "Repeated network errors indicating instability.".to_string(),
    },
    "service_crash_or_restart" => match count {
      Some(c) => format!("Service crash or frequent restarts: {} related events recorded.", c),
      None => "Crash or frequent restarts of a system or user service.".to_string(),
    },
    _ => match incident.severity {
      AlertSeverity::Critical | AlertSeverity::High => {
        "Critical security or stability incident.".to_string()
      }
      AlertSeverity::Medium => "Medium-priority incident requiring review.".to_string(),
      _ => "Informational incident, no immediate action required.".to_string(),
    },
  };

  // Append the affected process/service name when enrichment found one.
  for key in ["service", "process", "application"] {
    if let Some(name) = incident.details.get(key).and_then(|v| v.as_str()) {
      return format!("{} Affected {}: {}.", base, key, name);
    }
  }
  base
}

pub fn incident_title(incident: &Incident) -> String {
  format!("Security Incident: {}", incident.incident_type)
}

pub fn critical_event_title(event: &Event) -> String {
  format!("Critical Event: {}", event.event_type.as_str())
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Turns incidents and critical events into notification records and runs
/// the escalation state machine over the configured channels.
pub struct NotificationDispatcher {
  channels: Vec<Box<dyn Channel>>,
}

impl NotificationDispatcher {
  pub fn new(channels: Vec<Box<dyn Channel>>) -> Self {
    Self { channels }
  }

  pub fn internal_only() -> Self {
    Self::new(vec![Box::new(InternalChannel)])
  }

  /// Create and dispatch the single notification for a persisted incident.
  pub fn notify_incident(
    &self,
    store: &dyn NotificationStore,
    incident: &Incident,
  ) -> Result<Notification, EngineError> {
    self.create_and_send(
      store,
      NotificationType::Incident,
      incident.severity,
      incident_title(incident),
      incident_message(incident),
      Some(incident.id),
      incident.event_id,
      incident.details.clone(),
    )
  }

  /// Create and dispatch the single notification for a critical event.
  /// Non-critical events produce nothing.
  pub fn notify_critical_event(
    &self,
    store: &dyn NotificationStore,
    event: &Event,
  ) -> Result<Option<Notification>, EngineError> {
    if event.severity != Severity::Critical {
      return Ok(None);
    }

    let mut details = Details::new();
    details.insert("source_os".into(), json!(event.source_os));
    details.insert("source_category".into(), json!(event.source_category));

    let notification = self.create_and_send(
      store,
      NotificationType::CriticalEvent,
      AlertSeverity::Critical,
      critical_event_title(event),
      event.message.clone(),
      None,
      Some(event.id),
      details,
    )?;
    Ok(Some(notification))
  }

  /// State machine per notification:
  /// created `pending` on the internal channel; escalation to non-internal
  /// channels only for high/critical; external success → `sent`, external
  /// failure → `failed` + an `error` detail. Non-escalating notifications
  /// stay `pending` — the internal record is the delivery.
  #[allow(clippy::too_many_arguments)]
  fn create_and_send(
    &self,
    store: &dyn NotificationStore,
    notification_type: NotificationType,
    severity: AlertSeverity,
    title: String,
    message: String,
    incident_id: Option<u64>,
    event_id: Option<u64>,
    details: Details,
  ) -> Result<Notification, EngineError> {
    let mut stored = store.add_notification(Notification {
      id: 0,
      created_at: Utc::now(),
      notification_type,
      severity,
      title,
      message,
      incident_id,
      event_id,
      channel: "internal".to_string(),
      status: DeliveryStatus::Pending,
      details,
    })?;

    if !severity.escalates() {
      debug!(id = stored.id, "notification recorded internally, no escalation");
      return Ok(stored);
    }

    let mut touched = false;
    for channel in &self.channels {
      if channel.name() == "internal" {
        continue;
      }
      match channel.send(&stored.title, &stored.message, severity, &stored.details) {
        DeliveryOutcome::Delivered => {
          stored.status = DeliveryStatus::Sent;
          stored.channel = channel.name().to_string();
          touched = true;
        }
        DeliveryOutcome::Failed(reason) => {
          warn!(channel = channel.name(), %reason, "channel delivery failed");
          stored.status = DeliveryStatus::Failed;
          stored.details.insert("error".into(), json!(reason));
          touched = true;
        }
      }
    }

    if touched {
      store.update_notification(&stored)?;
    }
    Ok(stored)
  }
}
