//! Event classification: free-text log records into the typed taxonomy.
//!
//! Both functions are total and deterministic — every input maps to a
//! defined default, nothing here can fail.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{Details, EventType, SourceCategory};

// Keyword groups tested in fixed priority order against the lower-cased
// message. Authentication outranks network outranks service outranks process.
const AUTH_KEYWORDS: &[&str] = &[
  "login",
  "logon",
  "auth",
  "password",
  "credential",
  "session",
  "sudo",
  "access denied",
  "failed login",
];

const NETWORK_KEYWORDS: &[&str] = &[
  "network",
  "dns",
  "socket",
  "timeout",
  "timed out",
  "refused",
  "unreachable",
  "tcp",
  "udp",
  "http",
  "tls",
  "connection",
];

const SERVICE_KEYWORDS: &[&str] = &[
  "service",
  "daemon",
  "launchd",
  "systemd",
  "crash",
  "terminated",
  "restart",
  "panic",
  "kernel",
  "failed to start",
];

const PROCESS_KEYWORDS: &[&str] = &[
  "process",
  "pid",
  "exec",
  "spawn",
  "thread",
  "application",
];

/// Process/service names that always indicate a system service source.
const SYSTEM_SERVICES: &[&str] = &[
  "systemd",
  "launchd",
  "kernel",
  "init",
  "sshd",
  "cron",
  "crond",
  "dbus",
  "journald",
  "networkd",
  "syslogd",
  "logind",
];

const SYSTEMISH_SUBSYSTEMS: &[&str] = &["kernel", "system", "daemon", "hardware", "power", "security"];
const USERISH_SUBSYSTEMS: &[&str] = &["user", "app", "application", "ui", "gui"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
  needles.iter().any(|n| haystack.contains(n))
}

fn raw_str<'a>(raw: &'a Details, key: &str) -> Option<&'a str> {
  raw.get(key).and_then(|v| v.as_str())
}

fn unit_pattern() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"\b[A-Za-z0-9_@.-]+\.service\b").expect("valid unit pattern")
  })
}

/// Map a raw message/field-set to an event type.
///
/// Keyword cascade over the message first; if nothing matches, an explicit
/// `event_type`/`category`/`type` raw field is re-tested against abbreviated
/// groups; default is `system`.
pub fn classify_event_type(message: &str, raw: &Details) -> EventType {
  let msg = message.to_lowercase();

  if contains_any(&msg, AUTH_KEYWORDS) {
    return EventType::Authentication;
  }
  if contains_any(&msg, NETWORK_KEYWORDS) {
    return EventType::Network;
  }
  if contains_any(&msg, SERVICE_KEYWORDS) {
    return EventType::Service;
  }
  if contains_any(&msg, PROCESS_KEYWORDS) {
    return EventType::Process;
  }

  for key in ["event_type", "category", "type"] {
    if let Some(value) = raw_str(raw, key) {
      let value = value.to_lowercase();
      if contains_any(&value, &["auth", "login"]) {
        return EventType::Authentication;
      }
      if contains_any(&value, &["net", "dns"]) {
        return EventType::Network;
      }
      if contains_any(&value, &["service", "daemon"]) {
        return EventType::Service;
      }
      if contains_any(&value, &["process", "app"]) {
        return EventType::Process;
      }
    }
  }

  EventType::System
}

/// Map a raw message/field-set to a source category.
///
/// Priority cascade; explicit structured fields always outrank free-text
/// inference:
/// 1. process/service/application field in the known system-service list.
/// 2. subsystem/category field keyword-matched system-ish vs. user/app-ish.
/// 3. systemd-unit pattern (`name.service`) in the message.
/// 4. generic daemon/service-ish vs. app-ish message keywords.
/// 5. default `os`.
pub fn classify_source_category(message: &str, raw: &Details, _source_os: &str) -> SourceCategory {
  for key in ["process", "service", "application"] {
    if let Some(name) = raw_str(raw, key) {
      let name = name.to_lowercase();
      if SYSTEM_SERVICES.iter().any(|s| name == *s) {
        return SourceCategory::Service;
      }
      // Known-service miss falls through to the weaker checks below.
    }
  }

  for key in ["subsystem", "category"] {
    if let Some(value) = raw_str(raw, key) {
      let value = value.to_lowercase();
      if contains_any(&value, SYSTEMISH_SUBSYSTEMS) {
        return SourceCategory::Service;
      }
      if contains_any(&value, USERISH_SUBSYSTEMS) {
        return SourceCategory::UserProcess;
      }
    }
  }

  if unit_pattern().is_match(message) {
    return SourceCategory::UserProcess;
  }

  let msg = message.to_lowercase();
  if contains_any(&msg, &["daemon", "systemd", "launchd", "kernel"]) {
    return SourceCategory::Service;
  }
  if contains_any(&msg, &["application", "helper", "gui"]) {
    return SourceCategory::UserProcess;
  }

  SourceCategory::Os
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn raw(pairs: &[(&str, &str)]) -> Details {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), json!(v)))
      .collect()
  }

  #[test]
  fn auth_keywords_win_over_everything() {
    // Contains both auth and network keywords; auth group has priority.
    let t = classify_event_type("Failed login over the network", &Details::new());
    assert_eq!(t, EventType::Authentication);
  }

  #[test]
  fn keyword_priority_order() {
    assert_eq!(
      classify_event_type("connection refused by peer", &Details::new()),
      EventType::Network
    );
    assert_eq!(
      classify_event_type("worker crashed with signal 11", &Details::new()),
      EventType::Service
    );
    assert_eq!(
      classify_event_type("spawned worker with pid 4411", &Details::new()),
      EventType::Process
    );
  }

  #[test]
  fn falls_back_to_explicit_field_then_system() {
    let t = classify_event_type("something odd happened", &raw(&[("category", "net")]));
    assert_eq!(t, EventType::Network);

    let t = classify_event_type("something odd happened", &raw(&[("type", "auth")]));
    assert_eq!(t, EventType::Authentication);

    assert_eq!(
      classify_event_type("something odd happened", &Details::new()),
      EventType::System
    );
  }

  #[test]
  fn known_system_service_field_wins() {
    let t = classify_source_category("boot complete", &raw(&[("process", "launchd")]), "macos");
    assert_eq!(t, SourceCategory::Service);
  }

  #[test]
  fn unknown_process_field_falls_through() {
    // nginx is not in the known system-service list: the message carries no
    // category hints either, so the default applies.
    let t = classify_source_category("connection refused", &raw(&[("process", "nginx")]), "linux");
    assert_eq!(t, SourceCategory::Os);
  }

  #[test]
  fn subsystem_field_outranks_message_text() {
    let t = classify_source_category(
      "daemon watchdog fired",
      &raw(&[("subsystem", "com.apple.useractivity")]),
      "macos",
    );
    assert_eq!(t, SourceCategory::UserProcess);
  }

  #[test]
  fn systemd_unit_in_message_means_user_process() {
    let t = classify_source_category(
      "nginx.service: Main process exited, status=1/FAILURE",
      &Details::new(),
      "linux",
    );
    assert_eq!(t, SourceCategory::UserProcess);
  }

  #[test]
  fn message_keywords_as_last_resort() {
    assert_eq!(
      classify_source_category("kernel watchdog timer expired", &Details::new(), "linux"),
      SourceCategory::Service
    );
    assert_eq!(
      classify_source_category("application became unresponsive", &Details::new(), "macos"),
      SourceCategory::UserProcess
    );
    assert_eq!(
      classify_source_category("disk pressure normal", &Details::new(), "macos"),
      SourceCategory::Os
    );
  }
}
