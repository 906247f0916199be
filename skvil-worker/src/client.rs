//! HTTP client for the broker RPC surface.
//!
//! Every call carries the hard fetch timeout, and every failure mode
//! (connection refused, timeout, non-2xx status, unparsable body) is
//! normalized into [`ClientError`]. Nothing here panics or leaks transport
//! details into the autonomous loop.

use serde::de::DeserializeOwned;
use thiserror::Error;

use skvil_core::limits;
use skvil_core::message::MessageKind;
use skvil_core::wire::{
    AckRequest, AckResponse, AgentsResponse, BroadcastRequest, BroadcastResponse, ClearResponse,
    ContextValueResponse, ErrorResponse, ListContextsResponse, OkResponse, ReadResponse,
    RegisterRequest, RegisterResponse, SendRequest, SendResponse, SetContextRequest,
    SetContextResponse, StatusResponse,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure or timeout; the broker may be unreachable.
    #[error("transport error: {0}")]
    Transport(String),

    /// The broker answered with an error status and message.
    #[error("broker error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The broker answered 2xx but the body did not parse.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// The broker-restart signal: our registration is gone server-side.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

pub struct BrokerClient {
    http: reqwest::Client,
    base: String,
    agent_id: String,
}

impl BrokerClient {
    pub fn new(base_url: &str, agent_id: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(limits::FETCH_TIMEOUT)
            .build()
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base: base_url.trim_end_matches('/').to_string(),
            agent_id: agent_id.to_string(),
        })
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|err| ClientError::InvalidResponse(err.to_string()))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ClientError> {
        self.execute(
            self.http
                .post(format!("{}/agents/register", self.base))
                .json(request),
        )
        .await
    }

    pub async fn heartbeat(&self) -> Result<OkResponse, ClientError> {
        self.execute(
            self.http
                .post(format!("{}/agents/{}/heartbeat", self.base, self.agent_id)),
        )
        .await
    }

    /// Best-effort removal on shutdown; carries its own, shorter timeout.
    pub async fn deregister(&self) -> Result<OkResponse, ClientError> {
        self.execute(
            self.http
                .delete(format!("{}/agents/{}", self.base, self.agent_id))
                .timeout(limits::DEREGISTER_TIMEOUT),
        )
        .await
    }

    pub async fn list_agents(&self) -> Result<AgentsResponse, ClientError> {
        self.execute(self.http.get(format!("{}/agents", self.base)))
            .await
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    pub async fn send(
        &self,
        to: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<SendResponse, ClientError> {
        let body = SendRequest {
            from: self.agent_id.clone(),
            to: to.to_string(),
            content: content.to_string(),
            kind,
        };
        self.execute(
            self.http
                .post(format!("{}/messages/send", self.base))
                .json(&body),
        )
        .await
    }

    pub async fn broadcast(
        &self,
        content: &str,
        kind: MessageKind,
    ) -> Result<BroadcastResponse, ClientError> {
        let body = BroadcastRequest {
            from: self.agent_id.clone(),
            content: content.to_string(),
            kind,
        };
        self.execute(
            self.http
                .post(format!("{}/messages/broadcast", self.base))
                .json(&body),
        )
        .await
    }

    pub async fn read(&self, unread_only: bool, limit: usize) -> Result<ReadResponse, ClientError> {
        self.execute(
            self.http
                .get(format!("{}/messages/{}", self.base, self.agent_id))
                .query(&[
                    ("unread", unread_only.to_string()),
                    ("limit", limit.to_string()),
                ]),
        )
        .await
    }

    pub async fn ack(&self, ids: &[String]) -> Result<AckResponse, ClientError> {
        let body = AckRequest { ids: ids.to_vec() };
        self.execute(
            self.http
                .post(format!("{}/messages/{}/ack", self.base, self.agent_id))
                .json(&body),
        )
        .await
    }

    pub async fn clear_messages(&self) -> Result<ClearResponse, ClientError> {
        self.execute(
            self.http
                .delete(format!("{}/messages/{}", self.base, self.agent_id)),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Context
    // -----------------------------------------------------------------------

    pub async fn set_context(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<SetContextResponse, ClientError> {
        let body = SetContextRequest {
            key: key.to_string(),
            value: Some(value),
            set_by: self.agent_id.clone(),
        };
        self.execute(self.http.post(format!("{}/context", self.base)).json(&body))
            .await
    }

    pub async fn get_context(&self, key: &str) -> Result<ContextValueResponse, ClientError> {
        self.execute(self.http.get(format!("{}/context/{key}", self.base)))
            .await
    }

    pub async fn list_contexts(&self) -> Result<ListContextsResponse, ClientError> {
        self.execute(self.http.get(format!("{}/context", self.base)))
            .await
    }

    pub async fn delete_context(&self, key: &str) -> Result<OkResponse, ClientError> {
        self.execute(self.http.delete(format!("{}/context/{key}", self.base)))
            .await
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        self.execute(self.http.get(format!("{}/status", self.base)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_registered_detection() {
        let err = ClientError::Api {
            status: 404,
            message: "agent 'w' is not registered".into(),
        };
        assert!(err.is_not_registered());

        let err = ClientError::Api {
            status: 429,
            message: "agent limit of 100 reached".into(),
        };
        assert!(!err.is_not_registered());

        let err = ClientError::Transport("connection refused".into());
        assert!(!err.is_not_registered());
    }
}
