//! In-memory record of behaviour switches.
//!
//! Every successful switch appends one [`SwitchRecord`]. The history lives
//! only as long as the machine that owns it, but it serializes for export.
//! An optional limit keeps long-running machines from growing it without
//! bound.

use crate::behaviour::NavigatorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single switch between behaviours.
///
/// # Example
///
/// ```rust
/// use waypoint::behaviour::NavigatorKind;
/// use waypoint::core::SwitchRecord;
/// use chrono::Utc;
///
/// let record = SwitchRecord {
///     from: Some("Fetch".to_string()),
///     to: "Parse".to_string(),
///     state: "Parse".to_string(),
///     via: Some(NavigatorKind::Continuation),
///     timestamp: Utc::now(),
/// };
/// assert_eq!(record.to, "Parse");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    /// Behaviour active before the switch; `None` for the initial install
    pub from: Option<String>,
    /// Behaviour active after the switch
    pub to: String,
    /// Key of the state installed with it
    pub state: String,
    /// Navigator that requested the switch, if any
    pub via: Option<NavigatorKind>,
    /// When the switch happened
    pub timestamp: DateTime<Utc>,
}

/// Ordered history of switches.
///
/// # Example
///
/// ```rust
/// use waypoint::behaviour::NavigatorKind;
/// use waypoint::core::{SwitchHistory, SwitchRecord};
/// use chrono::Utc;
///
/// let mut history = SwitchHistory::new();
/// history.record(SwitchRecord {
///     from: None,
///     to: "Start".to_string(),
///     state: "Start".to_string(),
///     via: None,
///     timestamp: Utc::now(),
/// });
/// history.record(SwitchRecord {
///     from: Some("Start".to_string()),
///     to: "End".to_string(),
///     state: "End".to_string(),
///     via: Some(NavigatorKind::Continuation),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.get_path(), vec!["Start", "End"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchHistory {
    records: Vec<SwitchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    /// Records dropped to stay within `limit`
    #[serde(default)]
    evicted: usize,
}

impl SwitchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history that keeps only the `limit` most recent records.
    pub fn bounded(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Change the limit, trimming the oldest records if needed.
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
        self.trim();
    }

    /// Number of records dropped so far because of the limit.
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    pub fn record(&mut self, record: SwitchRecord) {
        self.records.push(record);
        self.trim();
    }

    fn trim(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        let excess = self.records.len().saturating_sub(limit);
        if excess > 0 {
            self.records.drain(..excess);
            self.evicted += excess;
        }
    }

    pub fn last(&self) -> Option<&SwitchRecord> {
        self.records.last()
    }

    /// Behaviours visited, in order, as far back as the kept records go.
    ///
    /// Starts with the `from` of the first record when it has one, then the
    /// `to` of every record.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(from) = self.records.first().and_then(|r| r.from.as_deref()) {
            path.push(from);
        }
        for record in &self.records {
            path.push(record.to.as_str());
        }
        path
    }

    /// Number of switches into `behaviour`.
    pub fn entries_into(&self, behaviour: &str) -> usize {
        self.records.iter().filter(|r| r.to == behaviour).count()
    }

    /// Time between the first and the last switch.
    pub fn duration(&self) -> Option<Duration> {
        let (first, last) = (self.records.first()?, self.records.last()?);
        last.timestamp
            .signed_duration_since(first.timestamp)
            .to_std()
            .ok()
    }

    pub fn records(&self) -> &[SwitchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
