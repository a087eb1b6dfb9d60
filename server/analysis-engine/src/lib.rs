//! SIEM Log Analysis Engine — deterministic, rule-based.
//!
//! Ingests normalized OS/application log records, classifies them into a
//! typed taxonomy, evaluates threshold rules over sliding time windows,
//! deduplicates detections across overlapping runs, and dispatches
//! notifications through pluggable channels.
//!
//! Storage is a contract (`store::Store`); an in-memory reference
//! implementation backs the CLI and the tests.

pub mod classify;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod notify;
pub mod rules;
pub mod store;
pub mod types;

pub use config::Config;
pub use dedup::DedupPolicy;
pub use engine::{AnalysisEngine, AnalysisReport, IngestReport};
pub use error::EngineError;
pub use notify::{Channel, DeliveryOutcome, InternalChannel, NotificationDispatcher};
pub use store::MemoryStore;
pub use types::{Event, Incident, Notification, NormalizedEvent};
