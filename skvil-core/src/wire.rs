//! Request and response bodies for the broker HTTP surface.
//!
//! Every response is either a success body carrying `ok: true` (plus
//! method-specific fields) or the uniform [`ErrorResponse`]. Field names are
//! camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::message::{Message, MessageKind};

/// Uniform error shape for every failed RPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Bare success acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub ok: bool,
    pub agent_id: String,
    pub total_agents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentsResponse {
    pub agents: Vec<Agent>,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub ok: bool,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub ok: bool,
    pub sent_to: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    pub messages: Vec<Message>,
    /// Size of the filtered snapshot before the limit was applied.
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckRequest {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
    pub acked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub ok: bool,
    pub cleared: usize,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetContextRequest {
    #[serde(default)]
    pub key: String,
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub set_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetContextResponse {
    pub ok: bool,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextValueResponse {
    pub value: serde_json::Value,
    pub set_by: String,
    pub set_by_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub key: String,
    pub set_by: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListContextsResponse {
    pub contexts: Vec<ContextSummary>,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAgent {
    #[serde(flatten)]
    pub agent: Agent,
    pub unread_messages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub broker: String,
    pub uptime: u64,
    pub agents: Vec<StatusAgent>,
    pub total_agents: usize,
    pub total_context_keys: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_accepts_camel_case() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"agentId":"alpha","name":"Alpha","project":"demo","path":"/tmp/demo"}"#,
        )
        .unwrap();
        assert_eq!(req.agent_id, "alpha");
        assert_eq!(req.project, "demo");
    }

    #[test]
    fn send_request_defaults_missing_kind() {
        let req: SendRequest =
            serde_json::from_str(r#"{"from":"a","to":"b","content":"hi"}"#).unwrap();
        assert_eq!(req.kind, MessageKind::Text);
    }

    #[test]
    fn set_context_distinguishes_null_from_missing_value() {
        let req: SetContextRequest =
            serde_json::from_str(r#"{"key":"k","setBy":"a"}"#).unwrap();
        assert!(req.value.is_none());

        let req: SetContextRequest =
            serde_json::from_str(r#"{"key":"k","value":null,"setBy":"a"}"#).unwrap();
        // JSON null is also rejected by the engine; both shapes arrive as None
        // or Some(Null) and the handler treats them alike.
        assert!(matches!(req.value, Some(serde_json::Value::Null)));
    }

    #[test]
    fn status_agent_flattens_metadata() {
        let agent = Agent::new(
            "alpha".into(),
            "Alpha".into(),
            "demo".into(),
            "/tmp".into(),
            Utc::now(),
        );
        let status = StatusAgent {
            agent,
            unread_messages: 3,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["id"], "alpha");
        assert_eq!(json["unreadMessages"], 3);
        assert!(json["registeredAt"].is_string());
    }
}
