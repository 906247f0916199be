//! The broker state engine: agents, per-agent message queues, and the shared
//! context store.
//!
//! The engine is synchronous and owns no locks; [`crate::state::BrokerState`]
//! wraps it in a single coarse lock so every operation is atomic with respect
//! to every other. Every mutating operation takes `now` as an argument, which
//! keeps quota, overflow, and staleness behavior directly testable.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use skvil_core::agent::Agent;
use skvil_core::context::ContextEntry;
use skvil_core::error::BrokerError;
use skvil_core::limits;
use skvil_core::message::{BROKER_SENDER, BROKER_SENDER_NAME, Message, MessageKind, generate_message_id};
use skvil_core::wire::{ContextSummary, StatusAgent};

/// Stable copy of a queue handed to readers.
#[derive(Debug, Clone)]
pub struct ReadSnapshot {
    pub messages: Vec<Message>,
    /// Filtered size before the limit was applied.
    pub total: usize,
    pub has_more: bool,
}

#[derive(Default)]
pub struct Engine {
    agents: HashMap<String, Agent>,
    queues: HashMap<String, VecDeque<Message>>,
    contexts: HashMap<String, ContextEntry>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Agents
    // -----------------------------------------------------------------------

    /// Register a new agent or refresh an existing one.
    ///
    /// Re-registering an existing id overwrites its metadata and refreshes
    /// `last_seen` while preserving its queue; this is the recovery path a
    /// worker takes after a broker restart. Returns the total agent count.
    pub fn register(
        &mut self,
        id: &str,
        name: &str,
        project: &str,
        path: &str,
        now: DateTime<Utc>,
    ) -> Result<usize, BrokerError> {
        if id.is_empty() || name.is_empty() {
            return Err(BrokerError::InvalidArgument(
                "agentId and name are required".into(),
            ));
        }

        match self.agents.get_mut(id) {
            Some(agent) => {
                agent.name = name.to_string();
                agent.project = project.to_string();
                agent.path = path.to_string();
                agent.last_seen = now;
            }
            None => {
                if self.agents.len() >= limits::MAX_AGENTS {
                    return Err(BrokerError::ResourceExhausted(format!(
                        "agent limit of {} reached",
                        limits::MAX_AGENTS
                    )));
                }
                self.agents.insert(
                    id.to_string(),
                    Agent::new(
                        id.to_string(),
                        name.to_string(),
                        project.to_string(),
                        path.to_string(),
                        now,
                    ),
                );
            }
        }

        // Queue creation is coincident with registration.
        self.queues.entry(id.to_string()).or_default();

        Ok(self.agents.len())
    }

    /// Refresh an agent's liveness. The NotFound result is what triggers a
    /// worker to re-register after a broker restart.
    pub fn heartbeat(&mut self, id: &str, now: DateTime<Utc>) -> Result<(), BrokerError> {
        match self.agents.get_mut(id) {
            Some(agent) => {
                agent.last_seen = now;
                Ok(())
            }
            None => Err(BrokerError::NotFound(format!(
                "agent '{id}' is not registered"
            ))),
        }
    }

    /// Remove an agent and its queue. Idempotent.
    pub fn deregister(&mut self, id: &str) -> bool {
        self.queues.remove(id);
        self.agents.remove(id).is_some()
    }

    /// All registered agents, oldest registration first.
    pub fn agents(&self) -> Vec<Agent> {
        let mut list: Vec<Agent> = self.agents.values().cloned().collect();
        list.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then(a.id.cmp(&b.id)));
        list
    }

    pub fn total_agents(&self) -> usize {
        self.agents.len()
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Enqueue a message for one recipient. Returns the generated message id.
    pub fn send(
        &mut self,
        from: &str,
        to: &str,
        content: &str,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Result<String, BrokerError> {
        if to.is_empty() {
            return Err(BrokerError::InvalidArgument("to is required".into()));
        }
        let from_name = self.validate_sender(from, content)?;

        if !self.agents.contains_key(to) {
            return Err(BrokerError::NotFound(format!(
                "recipient '{to}' is not registered"
            )));
        }
        self.check_content_size(content)?;

        let id = self.enqueue(to, from, &from_name, content, kind, now);
        Ok(id)
    }

    /// Enqueue one message per registered agent except the sender. Each
    /// recipient gets an independently generated id. Returns the fan-out
    /// count.
    pub fn broadcast(
        &mut self,
        from: &str,
        content: &str,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Result<usize, BrokerError> {
        let from_name = self.validate_sender(from, content)?;
        self.check_content_size(content)?;

        let recipients: Vec<String> = self
            .agents
            .keys()
            .filter(|id| id.as_str() != from)
            .cloned()
            .collect();

        for to in &recipients {
            self.enqueue(to, from, &from_name, content, kind, now);
        }
        Ok(recipients.len())
    }

    /// Read a stable snapshot of an agent's queue without touching `read`
    /// flags; acknowledgement is a separate, explicit step. An unknown agent
    /// reads as empty.
    pub fn read(&self, id: &str, unread_only: bool, limit: usize) -> ReadSnapshot {
        let Some(queue) = self.queues.get(id) else {
            return ReadSnapshot {
                messages: Vec::new(),
                total: 0,
                has_more: false,
            };
        };

        let filtered: Vec<Message> = queue
            .iter()
            .filter(|m| !unread_only || !m.read)
            .cloned()
            .collect();

        let total = filtered.len();
        let has_more = total > limit;
        let mut messages = filtered;
        messages.truncate(limit);

        ReadSnapshot {
            messages,
            total,
            has_more,
        }
    }

    /// Flip `read` to true for each queued message whose id is in `ids`.
    /// Unknown ids are ignored; returns the number of actual transitions.
    pub fn ack(&mut self, id: &str, ids: &[String]) -> Result<usize, BrokerError> {
        if ids.is_empty() {
            return Err(BrokerError::InvalidArgument(
                "ids must not be empty".into(),
            ));
        }

        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut acked = 0;
        if let Some(queue) = self.queues.get_mut(id) {
            for message in queue.iter_mut() {
                if !message.read && wanted.contains(message.id.as_str()) {
                    message.read = true;
                    acked += 1;
                }
            }
        }
        Ok(acked)
    }

    /// Truncate an agent's queue. Returns how many messages were dropped.
    pub fn clear_messages(&mut self, id: &str) -> Result<usize, BrokerError> {
        match self.queues.get_mut(id) {
            Some(queue) => {
                let cleared = queue.len();
                queue.clear();
                Ok(cleared)
            }
            None => Err(BrokerError::NotFound(format!(
                "agent '{id}' is not registered"
            ))),
        }
    }

    fn validate_sender(&self, from: &str, content: &str) -> Result<String, BrokerError> {
        if from.is_empty() {
            return Err(BrokerError::InvalidArgument("from is required".into()));
        }
        if content.is_empty() {
            return Err(BrokerError::InvalidArgument("content is required".into()));
        }

        // Operator messages carry the reserved sender and skip the
        // registration check.
        if from == BROKER_SENDER {
            return Ok(BROKER_SENDER_NAME.to_string());
        }
        match self.agents.get(from) {
            Some(agent) => Ok(agent.name.clone()),
            None => Err(BrokerError::InvalidArgument(format!(
                "sender '{from}' is not registered"
            ))),
        }
    }

    fn check_content_size(&self, content: &str) -> Result<(), BrokerError> {
        if content.len() > limits::MAX_MESSAGE_CONTENT_SIZE {
            return Err(BrokerError::PayloadTooLarge(format!(
                "content exceeds {} bytes",
                limits::MAX_MESSAGE_CONTENT_SIZE
            )));
        }
        Ok(())
    }

    fn enqueue(
        &mut self,
        to: &str,
        from: &str,
        from_name: &str,
        content: &str,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> String {
        let message = Message {
            id: generate_message_id(now),
            from: from.to_string(),
            from_name: from_name.to_string(),
            content: content.to_string(),
            kind,
            timestamp: now,
            read: false,
        };
        let id = message.id.clone();

        let queue = self.queues.entry(to.to_string()).or_default();
        queue.push_back(message);

        // Overflow drops oldest-first, silently to the sender.
        while queue.len() > limits::MAX_MESSAGES_PER_AGENT {
            if let Some(dropped) = queue.pop_front() {
                debug!(recipient = %to, message_id = %dropped.id, "queue overflow, dropped oldest message");
            }
        }

        id
    }

    // -----------------------------------------------------------------------
    // Context store
    // -----------------------------------------------------------------------

    /// Last-writer-wins set. `set_by_name` is resolved against the agent
    /// table at write time and falls back to the raw id.
    pub fn set_context(
        &mut self,
        key: &str,
        value: serde_json::Value,
        set_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        if key.is_empty() {
            return Err(BrokerError::InvalidArgument("key is required".into()));
        }
        if value.is_null() {
            return Err(BrokerError::InvalidArgument("value is required".into()));
        }

        let serialized = serde_json::to_string(&value).map_err(|e| {
            BrokerError::InvalidArgument(format!("value is not serializable: {e}"))
        })?;
        if serialized.len() > limits::MAX_CONTEXT_VALUE_SIZE {
            return Err(BrokerError::PayloadTooLarge(format!(
                "value exceeds {} bytes",
                limits::MAX_CONTEXT_VALUE_SIZE
            )));
        }

        if !self.contexts.contains_key(key) && self.contexts.len() >= limits::MAX_CONTEXT_KEYS {
            return Err(BrokerError::ResourceExhausted(format!(
                "context limit of {} keys reached",
                limits::MAX_CONTEXT_KEYS
            )));
        }

        let set_by_name = match self.agents.get(set_by) {
            Some(agent) => agent.name.clone(),
            None if set_by == BROKER_SENDER => BROKER_SENDER_NAME.to_string(),
            None => set_by.to_string(),
        };

        self.contexts.insert(
            key.to_string(),
            ContextEntry {
                value,
                set_by: set_by.to_string(),
                set_by_name,
                timestamp: now,
            },
        );
        Ok(())
    }

    pub fn get_context(&self, key: &str) -> Result<ContextEntry, BrokerError> {
        self.contexts
            .get(key)
            .cloned()
            .ok_or_else(|| BrokerError::NotFound(format!("context key '{key}' not found")))
    }

    pub fn list_contexts(&self) -> Vec<ContextSummary> {
        let mut list: Vec<ContextSummary> = self
            .contexts
            .iter()
            .map(|(key, entry)| ContextSummary {
                key: key.clone(),
                set_by: entry.set_by.clone(),
                timestamp: entry.timestamp,
            })
            .collect();
        list.sort_by(|a, b| a.key.cmp(&b.key));
        list
    }

    /// Idempotent delete.
    pub fn delete_context(&mut self, key: &str) -> bool {
        self.contexts.remove(key).is_some()
    }

    pub fn total_context_keys(&self) -> usize {
        self.contexts.len()
    }

    // -----------------------------------------------------------------------
    // Status & reaper
    // -----------------------------------------------------------------------

    /// Agent summaries with per-queue unread counts.
    pub fn status_agents(&self) -> Vec<StatusAgent> {
        self.agents()
            .into_iter()
            .map(|agent| {
                let unread_messages = self
                    .queues
                    .get(&agent.id)
                    .map(|q| q.iter().filter(|m| !m.read).count())
                    .unwrap_or(0);
                StatusAgent {
                    agent,
                    unread_messages,
                }
            })
            .collect()
    }

    /// Evict every agent whose last heartbeat is older than the staleness
    /// threshold. Returns the evicted ids. The reaper is the only
    /// time-based eviction mechanism.
    pub fn reap_stale(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let threshold = Duration::seconds(limits::STALE_AGENT_THRESHOLD.as_secs() as i64);
        let stale: Vec<String> = self
            .agents
            .values()
            .filter(|agent| now.signed_duration_since(agent.last_seen) > threshold)
            .map(|agent| agent.id.clone())
            .collect();

        for id in &stale {
            self.deregister(id);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine_with(ids: &[&str], now: DateTime<Utc>) -> Engine {
        let mut engine = Engine::new();
        for id in ids {
            engine
                .register(id, &format!("Agent {id}"), "demo", "/tmp/demo", now)
                .expect("register");
        }
        engine
    }

    #[test]
    fn register_requires_id_and_name() {
        let mut engine = Engine::new();
        let now = Utc::now();
        assert!(matches!(
            engine.register("", "Name", "", "", now),
            Err(BrokerError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.register("id", "", "", "", now),
            Err(BrokerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn register_cap_frees_on_deregister() {
        let now = Utc::now();
        let mut engine = Engine::new();
        for i in 1..=limits::MAX_AGENTS {
            engine
                .register(&format!("a{i:03}"), "A", "", "", now)
                .expect("register under cap");
        }

        assert!(matches!(
            engine.register("a101", "A", "", "", now),
            Err(BrokerError::ResourceExhausted(_))
        ));

        engine.deregister("a050");
        let total = engine.register("a101", "A", "", "", now).expect("slot freed");
        assert_eq!(total, limits::MAX_AGENTS);
    }

    #[test]
    fn reregister_preserves_queue_and_refreshes_metadata() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);
        engine
            .send("a", "b", "hello", MessageKind::Text, now)
            .expect("send");

        let later = now + Duration::seconds(5);
        engine
            .register("b", "B renamed", "other", "/elsewhere", later)
            .expect("re-register");

        let snapshot = engine.read("b", false, 50);
        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].content, "hello");

        let agents = engine.agents();
        let b = agents.iter().find(|a| a.id == "b").expect("agent b");
        assert_eq!(b.name, "B renamed");
        assert_eq!(b.last_seen, later);
    }

    #[test]
    fn heartbeat_unknown_agent_is_not_found() {
        let mut engine = Engine::new();
        assert!(matches!(
            engine.heartbeat("ghost", Utc::now()),
            Err(BrokerError::NotFound(_))
        ));
    }

    #[test]
    fn deregister_is_idempotent() {
        let now = Utc::now();
        let mut engine = engine_with(&["a"], now);
        assert!(engine.deregister("a"));
        assert!(!engine.deregister("a"));
    }

    #[test]
    fn send_validates_parties_and_size() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);

        assert!(matches!(
            engine.send("ghost", "b", "hi", MessageKind::Text, now),
            Err(BrokerError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.send("a", "ghost", "hi", MessageKind::Text, now),
            Err(BrokerError::NotFound(_))
        ));
        assert!(matches!(
            engine.send("a", "b", "", MessageKind::Text, now),
            Err(BrokerError::InvalidArgument(_))
        ));

        let oversized = "x".repeat(limits::MAX_MESSAGE_CONTENT_SIZE + 1);
        assert!(matches!(
            engine.send("a", "b", &oversized, MessageKind::Text, now),
            Err(BrokerError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn broker_sender_bypasses_registration_check() {
        let now = Utc::now();
        let mut engine = engine_with(&["a"], now);
        engine
            .send(BROKER_SENDER, "a", "oi", MessageKind::Text, now)
            .expect("operator send");

        let snapshot = engine.read("a", true, 50);
        assert_eq!(snapshot.messages[0].from, BROKER_SENDER);
        assert_eq!(snapshot.messages[0].from_name, BROKER_SENDER_NAME);
    }

    #[test]
    fn from_name_is_snapshotted_at_send_time() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);
        engine
            .send("a", "b", "first", MessageKind::Text, now)
            .expect("send");

        engine
            .register("a", "Renamed", "demo", "/tmp/demo", now)
            .expect("rename");
        engine
            .send("a", "b", "second", MessageKind::Text, now)
            .expect("send");

        let snapshot = engine.read("b", false, 50);
        assert_eq!(snapshot.messages[0].from_name, "Agent a");
        assert_eq!(snapshot.messages[1].from_name, "Renamed");
    }

    #[test]
    fn queue_overflow_drops_oldest() {
        let now = Utc::now();
        let mut engine = engine_with(&["s", "r"], now);
        let extra = 5;
        for i in 0..limits::MAX_MESSAGES_PER_AGENT + extra {
            engine
                .send("s", "r", &format!("m{i}"), MessageKind::Text, now)
                .expect("send");
        }

        let snapshot = engine.read("r", false, 500);
        assert_eq!(snapshot.messages.len(), limits::MAX_MESSAGES_PER_AGENT);
        assert_eq!(snapshot.messages[0].content, format!("m{extra}"));
        assert_eq!(
            snapshot.messages.last().unwrap().content,
            format!("m{}", limits::MAX_MESSAGES_PER_AGENT + extra - 1)
        );

        // Surviving ids stay unique.
        let ids: HashSet<&str> = snapshot.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), limits::MAX_MESSAGES_PER_AGENT);
    }

    #[test]
    fn read_does_not_ack_and_ack_is_separate() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);
        let id = engine
            .send("a", "b", "hello", MessageKind::Text, now)
            .expect("send");

        let first = engine.read("b", true, 50);
        assert_eq!(first.messages.len(), 1);
        assert!(!first.messages[0].read);

        // A second read still sees the message: Read never mutates flags.
        let second = engine.read("b", true, 50);
        assert_eq!(second.messages.len(), 1);

        let acked = engine.ack("b", &[id.clone()]).expect("ack");
        assert_eq!(acked, 1);

        assert!(engine.read("b", true, 50).messages.is_empty());

        // Re-acking the same id is a no-op transition.
        let again = engine.ack("b", &[id]).expect("ack again");
        assert_eq!(again, 0);
    }

    #[test]
    fn ack_rejects_empty_ids_and_ignores_unknown() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);
        engine
            .send("a", "b", "hello", MessageKind::Text, now)
            .expect("send");

        assert!(matches!(
            engine.ack("b", &[]),
            Err(BrokerError::InvalidArgument(_))
        ));
        let acked = engine
            .ack("b", &["nope".to_string()])
            .expect("unknown ids are ignored");
        assert_eq!(acked, 0);
    }

    #[test]
    fn read_limit_and_has_more() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);
        for i in 0..5 {
            engine
                .send("a", "b", &format!("m{i}"), MessageKind::Text, now)
                .expect("send");
        }

        let snapshot = engine.read("b", false, 3);
        assert_eq!(snapshot.messages.len(), 3);
        assert_eq!(snapshot.total, 5);
        assert!(snapshot.has_more);

        let all = engine.read("b", false, 10);
        assert!(!all.has_more);
    }

    #[test]
    fn read_unknown_agent_is_empty() {
        let engine = Engine::new();
        let snapshot = engine.read("ghost", true, 50);
        assert!(snapshot.messages.is_empty());
        assert!(!snapshot.has_more);
    }

    #[test]
    fn clear_messages_requires_known_agent() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);
        engine
            .send("a", "b", "hello", MessageKind::Text, now)
            .expect("send");

        assert_eq!(engine.clear_messages("b").expect("clear"), 1);
        assert_eq!(engine.clear_messages("b").expect("clear empty"), 0);
        assert!(matches!(
            engine.clear_messages("ghost"),
            Err(BrokerError::NotFound(_))
        ));
    }

    #[test]
    fn broadcast_skips_sender_and_generates_distinct_ids() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b", "c"], now);
        let sent_to = engine
            .broadcast("a", "fan-out", MessageKind::Text, now)
            .expect("broadcast");
        assert_eq!(sent_to, 2);

        assert!(engine.read("a", true, 50).messages.is_empty());
        let b_id = engine.read("b", true, 50).messages[0].id.clone();
        let c_id = engine.read("c", true, 50).messages[0].id.clone();
        assert_ne!(b_id, c_id);
    }

    #[test]
    fn context_last_writer_wins() {
        let now = Utc::now();
        let mut engine = engine_with(&["a"], now);
        engine
            .set_context("build", json!("v1"), "a", now)
            .expect("set");
        engine
            .set_context("build", json!("v2"), "a", now + Duration::seconds(1))
            .expect("overwrite");

        let entry = engine.get_context("build").expect("get");
        assert_eq!(entry.value, json!("v2"));
        assert_eq!(entry.set_by_name, "Agent a");
    }

    #[test]
    fn context_validation_and_quotas() {
        let now = Utc::now();
        let mut engine = engine_with(&["a"], now);

        assert!(matches!(
            engine.set_context("", json!("v"), "a", now),
            Err(BrokerError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.set_context("k", serde_json::Value::Null, "a", now),
            Err(BrokerError::InvalidArgument(_))
        ));

        let oversized = "x".repeat(limits::MAX_CONTEXT_VALUE_SIZE + 1);
        assert!(matches!(
            engine.set_context("k", json!(oversized), "a", now),
            Err(BrokerError::PayloadTooLarge(_))
        ));

        for i in 0..limits::MAX_CONTEXT_KEYS {
            engine
                .set_context(&format!("k{i}"), json!(i), "a", now)
                .expect("under cap");
        }
        assert!(matches!(
            engine.set_context("overflow", json!(1), "a", now),
            Err(BrokerError::ResourceExhausted(_))
        ));

        // Updating an existing key does not count against the cap.
        engine
            .set_context("k0", json!("updated"), "a", now)
            .expect("update existing");
    }

    #[test]
    fn context_set_by_name_falls_back_to_raw_id() {
        let now = Utc::now();
        let mut engine = Engine::new();
        engine
            .set_context("k", json!("v"), "unregistered", now)
            .expect("set");
        assert_eq!(engine.get_context("k").unwrap().set_by_name, "unregistered");
    }

    #[test]
    fn delete_context_is_idempotent() {
        let now = Utc::now();
        let mut engine = Engine::new();
        engine.set_context("k", json!("v"), "x", now).expect("set");
        assert!(engine.delete_context("k"));
        assert!(!engine.delete_context("k"));
        assert!(matches!(
            engine.get_context("k"),
            Err(BrokerError::NotFound(_))
        ));
    }

    #[test]
    fn status_counts_unread_per_agent() {
        let now = Utc::now();
        let mut engine = engine_with(&["a", "b"], now);
        for _ in 0..3 {
            engine
                .send("a", "b", "ping", MessageKind::Text, now)
                .expect("send");
        }
        let first_id = engine.read("b", true, 1).messages[0].id.clone();
        engine.ack("b", &[first_id]).expect("ack one");

        let status = engine.status_agents();
        let b = status.iter().find(|s| s.agent.id == "b").expect("agent b");
        assert_eq!(b.unread_messages, 2);
    }

    #[test]
    fn reaper_evicts_only_stale_agents() {
        let now = Utc::now();
        let mut engine = engine_with(&["fresh", "stale"], now);

        let later = now + Duration::seconds(91);
        engine.heartbeat("fresh", later).expect("heartbeat");

        let evicted = engine.reap_stale(later);
        assert_eq!(evicted, vec!["stale".to_string()]);
        assert!(matches!(
            engine.heartbeat("stale", later),
            Err(BrokerError::NotFound(_))
        ));
        assert_eq!(engine.total_agents(), 1);

        // Eviction destroys the queue too.
        assert!(matches!(
            engine.clear_messages("stale"),
            Err(BrokerError::NotFound(_))
        ));
    }

    #[test]
    fn reaper_boundary_is_strictly_greater() {
        let now = Utc::now();
        let mut engine = engine_with(&["edge"], now);
        let at_threshold = now + Duration::seconds(90);
        assert!(engine.reap_stale(at_threshold).is_empty());

        let past = now + Duration::seconds(91);
        assert_eq!(engine.reap_stale(past).len(), 1);
    }

    #[test]
    fn register_after_reap_recovers_delivery() {
        let now = Utc::now();
        let mut engine = engine_with(&["w", "peer"], now);

        let later = now + Duration::seconds(120);
        engine.heartbeat("peer", later).expect("peer stays alive");
        engine.reap_stale(later);

        assert!(matches!(
            engine.heartbeat("w", later),
            Err(BrokerError::NotFound(_))
        ));
        engine
            .register("w", "W", "demo", "/tmp", later)
            .expect("worker re-registers");
        engine
            .send("peer", "w", "welcome back", MessageKind::Text, later)
            .expect("delivery resumes");
        assert_eq!(engine.read("w", true, 50).messages.len(), 1);
    }
}
