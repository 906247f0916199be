use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered coding-agent instance as tracked by the broker.
///
/// `last_seen` is refreshed by Register and Heartbeat; the reaper evicts
/// agents whose `last_seen` falls behind the staleness threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub project: String,
    pub path: String,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        id: String,
        name: String,
        project: String,
        path: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            project,
            path,
            registered_at: now,
            last_seen: now,
        }
    }
}
