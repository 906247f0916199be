use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::RwLock;

use skvil_core::context::ContextEntry;
use skvil_core::error::BrokerError;
use skvil_core::message::MessageKind;
use skvil_core::wire::{ContextSummary, StatusResponse};

use crate::engine::{Engine, ReadSnapshot};

/// Shared handle over the state engine.
///
/// One coarse lock guards the whole engine, so every operation is atomic
/// with respect to every other, including multi-collection ones like
/// Register (agent + queue) and the reaper sweep. Engine operations never
/// suspend, so the lock is held only for in-memory work.
#[derive(Clone)]
pub struct BrokerState {
    engine: Arc<RwLock<Engine>>,
    started_at: Instant,
}

impl BrokerState {
    pub fn new() -> Self {
        Self {
            engine: Arc::new(RwLock::new(Engine::new())),
            started_at: Instant::now(),
        }
    }

    pub async fn register(
        &self,
        id: &str,
        name: &str,
        project: &str,
        path: &str,
    ) -> Result<usize, BrokerError> {
        self.engine
            .write()
            .await
            .register(id, name, project, path, Utc::now())
    }

    pub async fn heartbeat(&self, id: &str) -> Result<(), BrokerError> {
        self.engine.write().await.heartbeat(id, Utc::now())
    }

    pub async fn deregister(&self, id: &str) -> bool {
        self.engine.write().await.deregister(id)
    }

    pub async fn agents(&self) -> Vec<skvil_core::agent::Agent> {
        self.engine.read().await.agents()
    }

    pub async fn send(
        &self,
        from: &str,
        to: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<String, BrokerError> {
        self.engine
            .write()
            .await
            .send(from, to, content, kind, Utc::now())
    }

    pub async fn broadcast(
        &self,
        from: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<usize, BrokerError> {
        self.engine
            .write()
            .await
            .broadcast(from, content, kind, Utc::now())
    }

    pub async fn read(&self, id: &str, unread_only: bool, limit: usize) -> ReadSnapshot {
        self.engine.read().await.read(id, unread_only, limit)
    }

    pub async fn ack(&self, id: &str, ids: &[String]) -> Result<usize, BrokerError> {
        self.engine.write().await.ack(id, ids)
    }

    pub async fn clear_messages(&self, id: &str) -> Result<usize, BrokerError> {
        self.engine.write().await.clear_messages(id)
    }

    pub async fn set_context(
        &self,
        key: &str,
        value: serde_json::Value,
        set_by: &str,
    ) -> Result<(), BrokerError> {
        self.engine
            .write()
            .await
            .set_context(key, value, set_by, Utc::now())
    }

    pub async fn get_context(&self, key: &str) -> Result<ContextEntry, BrokerError> {
        self.engine.read().await.get_context(key)
    }

    pub async fn list_contexts(&self) -> Vec<ContextSummary> {
        self.engine.read().await.list_contexts()
    }

    pub async fn delete_context(&self, key: &str) -> bool {
        self.engine.write().await.delete_context(key)
    }

    pub async fn status(&self) -> StatusResponse {
        let engine = self.engine.read().await;
        StatusResponse {
            broker: "skvil-piertotum".to_string(),
            uptime: self.started_at.elapsed().as_secs(),
            agents: engine.status_agents(),
            total_agents: engine.total_agents(),
            total_context_keys: engine.total_context_keys(),
        }
    }

    /// One reaper sweep. Returns the evicted agent ids.
    pub async fn reap_stale(&self) -> Vec<String> {
        self.engine.write().await.reap_stale(Utc::now())
    }
}

impl Default for BrokerState {
    fn default() -> Self {
        Self::new()
    }
}
