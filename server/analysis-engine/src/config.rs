//! Engine configuration with sane defaults.
//!
//! An explicit struct threaded into the orchestrator at construction time;
//! no process-wide mutable state.

use crate::dedup::DedupPolicy;
use crate::rules::{default_rules, RuleSpec};

/// Credentials for one external messaging channel. The core ships only the
/// channel contract; these are consumed by whatever `Channel` implementation
/// the embedding application wires in.
#[derive(Debug, Clone)]
pub struct ChannelCredentials {
  pub bot_token: String,
  pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
  /// Trailing analysis window, in minutes.
  pub window_minutes: i64,
  /// Suppression policy applied before incidents are persisted.
  pub dedup: DedupPolicy,
  /// Detection rules, evaluated in order.
  pub rules: Vec<RuleSpec>,
  /// Optional external channel credentials.
  pub external_channel: Option<ChannelCredentials>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      window_minutes: 60,
      dedup: DedupPolicy::default(),
      rules: default_rules(),
      external_channel: None,
    }
  }
}
