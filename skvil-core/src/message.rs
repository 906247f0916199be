use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Reserved sender id for operator-originated messages. Bypasses the
/// sender-registration check and must never be replied to by workers.
pub const BROKER_SENDER: &str = "broker";

/// Display name attached to operator-originated messages.
pub const BROKER_SENDER_NAME: &str = "Operador";

/// Declared content type of a message.
///
/// Unknown wire values coerce to `Text` on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MessageKind {
    #[default]
    Text,
    Code,
    Schema,
    Endpoint,
    Config,
}

impl From<String> for MessageKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "code" => Self::Code,
            "schema" => Self::Schema,
            "endpoint" => Self::Endpoint,
            "config" => Self::Config,
            _ => Self::Text,
        }
    }
}

impl MessageKind {
    /// The kind an autonomous reply carries. `Config` is one-way: a reply
    /// to a config message goes back as plain text.
    pub fn reply_kind(self) -> Self {
        match self {
            Self::Config => Self::Text,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Code => "code",
            Self::Schema => "schema",
            Self::Endpoint => "endpoint",
            Self::Config => "config",
        }
    }
}

/// A message queued for one recipient agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Broker-generated id, unique within the recipient's queue.
    pub id: String,
    /// Sender agent id, or [`BROKER_SENDER`].
    pub from: String,
    /// Sender display name snapshotted at send time.
    pub from_name: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    /// Flips to true on Ack, never back.
    #[serde(default)]
    pub read: bool,
}

const ID_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random base-36 token, used for message-id suffixes and prompt nonces.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect()
}

/// Broker-generated message id: enqueue time in milliseconds plus a random
/// base-36 suffix. Collision probability is negligible within a process
/// lifetime.
pub fn generate_message_id(now: DateTime<Utc>) -> String {
    format!("{}-{}", now.timestamp_millis(), random_base36(ID_SUFFIX_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_coerces_to_text() {
        let kind: MessageKind = serde_json::from_str("\"blob\"").unwrap();
        assert_eq!(kind, MessageKind::Text);

        let kind: MessageKind = serde_json::from_str("\"schema\"").unwrap();
        assert_eq!(kind, MessageKind::Schema);
    }

    #[test]
    fn config_replies_downgrade_to_text() {
        assert_eq!(MessageKind::Config.reply_kind(), MessageKind::Text);
        assert_eq!(MessageKind::Code.reply_kind(), MessageKind::Code);
    }

    #[test]
    fn message_serializes_camel_case() {
        let msg = Message {
            id: "1700000000000-a1b2c3".into(),
            from: "alpha".into(),
            from_name: "Alpha".into(),
            content: "hi".into(),
            kind: MessageKind::Code,
            timestamp: Utc::now(),
            read: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["fromName"], "Alpha");
        assert_eq!(json["type"], "code");
        assert_eq!(json["read"], false);
    }

    #[test]
    fn generated_ids_carry_timestamp_and_suffix() {
        let now = Utc::now();
        let id = generate_message_id(now);
        let (millis, suffix) = id.split_once('-').expect("timestamp-suffix shape");
        assert_eq!(millis, now.timestamp_millis().to_string());
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
