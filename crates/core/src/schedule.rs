//! Schedule bookkeeping written by the background workers.

use serde::{Deserialize, Serialize};

/// A named schedule and its last run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInfo {
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    /// Epoch milliseconds of the last execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl ScheduleInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disabled: false,
            last_executed: None,
            frequency_ms: None,
            created: None,
            updated: None,
        }
    }
}

/// One execution of a schedule.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInstance {
    /// Row key, assigned on insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub schedule: String,
    /// Epoch milliseconds when the run started.
    pub executed: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
}

impl ScheduleInstance {
    pub fn new(schedule: impl Into<String>, executed: i64) -> Self {
        Self {
            id: None,
            schedule: schedule.into(),
            executed,
            duration_ms: None,
            created: None,
            updated: None,
        }
    }
}
