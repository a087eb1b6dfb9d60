//! Structured error types for the analysis engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("store: {op}: {reason}")]
  Store { op: String, reason: String },

  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn store(op: &str, reason: impl Into<String>) -> Self {
    Self::Store {
      op: op.to_string(),
      reason: reason.into(),
    }
  }

  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }
}
