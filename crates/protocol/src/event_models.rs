//! Observability events.
//!
//! Events are immutable facts emitted by steps and by the chain lifecycle.
//! They are written once and never modified by the core.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

/// A single recorded event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Event {
    /// When the event happened, at millisecond precision.
    pub timestamp: DateTime<Utc>,

    /// Event kind, e.g. `core:cardinality:error` or `chain:suspended`.
    pub kind: String,

    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::at(Utc::now(), kind)
    }

    /// Create an event with an explicit timestamp (truncated to milliseconds).
    pub fn at(timestamp: DateTime<Utc>, kind: impl Into<String>) -> Self {
        let timestamp = timestamp
            .duration_trunc(TimeDelta::milliseconds(1))
            .unwrap_or(timestamp);
        Self {
            timestamp,
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// UTC calendar day of the event, `YYYY-MM-DD`.
    pub fn day(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    /// ISO-8601 timestamp with milliseconds and a literal `Z`.
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}
