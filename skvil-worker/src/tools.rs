//! Named operations exposed to the host coding agent.
//!
//! Thin wrappers over the worker's broker client and processor; every tool
//! maps onto exactly one public API call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;

use skvil_core::limits;
use skvil_core::message::MessageKind;

use crate::client::BrokerClient;
use crate::processor::AutoProcessor;

/// Tool definition served by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

pub struct ToolRouter {
    client: Arc<BrokerClient>,
    processor: Arc<AutoProcessor>,
    shutdown: watch::Receiver<bool>,
}

impl ToolRouter {
    pub fn new(
        client: Arc<BrokerClient>,
        processor: Arc<AutoProcessor>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            processor,
            shutdown,
        }
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
            ToolDefinition {
                name: name.to_string(),
                description: description.to_string(),
                input_schema,
            }
        }

        let type_property = json!({
            "type": "string",
            "enum": ["text", "code", "schema", "endpoint", "config"],
            "description": "Content type; defaults to text"
        });

        vec![
            tool(
                "send_message",
                "Send a message to another agent on the broker",
                json!({
                    "type": "object",
                    "properties": {
                        "to": { "type": "string", "description": "Recipient agent id" },
                        "content": { "type": "string" },
                        "type": type_property,
                    },
                    "required": ["to", "content"]
                }),
            ),
            tool(
                "broadcast_message",
                "Send a message to every other registered agent",
                json!({
                    "type": "object",
                    "properties": {
                        "content": { "type": "string" },
                        "type": type_property,
                    },
                    "required": ["content"]
                }),
            ),
            tool(
                "check_messages",
                "Read this agent's message queue without acknowledging",
                json!({
                    "type": "object",
                    "properties": {
                        "unreadOnly": { "type": "boolean", "description": "Default true" },
                        "limit": { "type": "integer", "minimum": 1, "maximum": limits::MAX_TOOL_READ_LIMIT },
                    }
                }),
            ),
            tool(
                "ack_messages",
                "Acknowledge messages by id so they stop showing as unread",
                json!({
                    "type": "object",
                    "properties": {
                        "ids": { "type": "array", "items": { "type": "string" } },
                    },
                    "required": ["ids"]
                }),
            ),
            tool(
                "clear_messages",
                "Drop every message in this agent's queue",
                json!({ "type": "object", "properties": {} }),
            ),
            tool(
                "list_agents",
                "List agents currently registered on the broker",
                json!({ "type": "object", "properties": {} }),
            ),
            tool(
                "set_context",
                "Write a key into the shared context store",
                json!({
                    "type": "object",
                    "properties": {
                        "key": { "type": "string" },
                        "value": { "description": "Any JSON value" },
                    },
                    "required": ["key", "value"]
                }),
            ),
            tool(
                "get_context",
                "Read one key from the shared context store",
                json!({
                    "type": "object",
                    "properties": { "key": { "type": "string" } },
                    "required": ["key"]
                }),
            ),
            tool(
                "list_contexts",
                "List keys in the shared context store",
                json!({ "type": "object", "properties": {} }),
            ),
            tool(
                "delete_context",
                "Delete one key from the shared context store",
                json!({
                    "type": "object",
                    "properties": { "key": { "type": "string" } },
                    "required": ["key"]
                }),
            ),
            tool(
                "broker_status",
                "Broker uptime, agents, and queue depths",
                json!({ "type": "object", "properties": {} }),
            ),
            tool(
                "set_auto_process",
                "Turn autonomous message processing on or off",
                json!({
                    "type": "object",
                    "properties": { "enabled": { "type": "boolean" } },
                    "required": ["enabled"]
                }),
            ),
        ]
    }

    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<Value, String> {
        match name {
            "send_message" => {
                let to = required_str(args, "to")?;
                let content = required_str(args, "content")?;
                let response = self
                    .client
                    .send(to, content, kind_arg(args))
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "broadcast_message" => {
                let content = required_str(args, "content")?;
                let response = self
                    .client
                    .broadcast(content, kind_arg(args))
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "check_messages" => {
                let unread_only = args
                    .get("unreadOnly")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let limit = read_limit(args);
                let response = self
                    .client
                    .read(unread_only, limit)
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "ack_messages" => {
                let ids: Vec<String> = args
                    .get("ids")
                    .and_then(Value::as_array)
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .ok_or_else(|| "'ids' is required".to_string())?;
                let response = self.client.ack(&ids).await.map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "clear_messages" => {
                let response = self
                    .client
                    .clear_messages()
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "list_agents" => {
                let response = self
                    .client
                    .list_agents()
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "set_context" => {
                let key = required_str(args, "key")?;
                let value = args
                    .get("value")
                    .cloned()
                    .ok_or_else(|| "'value' is required".to_string())?;
                let response = self
                    .client
                    .set_context(key, value)
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "get_context" => {
                let key = required_str(args, "key")?;
                let response = self
                    .client
                    .get_context(key)
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "list_contexts" => {
                let response = self
                    .client
                    .list_contexts()
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "delete_context" => {
                let key = required_str(args, "key")?;
                let response = self
                    .client
                    .delete_context(key)
                    .await
                    .map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "broker_status" => {
                let response = self.client.status().await.map_err(|err| err.to_string())?;
                to_json(&response)
            }
            "set_auto_process" => {
                let enabled = args
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| "'enabled' is required".to_string())?;
                if enabled {
                    self.processor.start(self.shutdown.clone());
                } else {
                    self.processor.stop();
                }
                Ok(json!({
                    "ok": true,
                    "enabled": self.processor.is_enabled(),
                    "disableReason": self.processor.disable_reason(),
                }))
            }
            other => Err(format!("unknown tool '{other}'")),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| err.to_string())
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("'{key}' is required"))
}

fn kind_arg(args: &Value) -> MessageKind {
    match args.get("type") {
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
        None => MessageKind::default(),
    }
}

/// Tool reads are capped regardless of what the host asks for.
fn read_limit(args: &Value) -> usize {
    args.get("limit")
        .and_then(Value::as_u64)
        .map(|l| (l as usize).clamp(1, limits::MAX_TOOL_READ_LIMIT))
        .unwrap_or(limits::DEFAULT_READ_LIMIT)
}
