use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-writer-wins entry in the shared context store.
///
/// Values are opaque JSON; callers storing structured data serialize it
/// themselves. `set_by_name` is a snapshot of the writer's display name at
/// write time and is not rewritten if the writer later renames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub value: serde_json::Value,
    pub set_by: String,
    pub set_by_name: String,
    pub timestamp: DateTime<Utc>,
}
