use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::instrument;

use skvil_core::error::BrokerError;
use skvil_core::limits;
use skvil_core::wire::{
    AckRequest, AckResponse, AgentsResponse, BroadcastRequest, BroadcastResponse, ClearResponse,
    ContextValueResponse, ErrorResponse, ListContextsResponse, OkResponse, ReadResponse,
    RegisterRequest, RegisterResponse, SendRequest, SendResponse, SetContextRequest,
    SetContextResponse,
};

use crate::state::BrokerState;

/// Map the engine taxonomy onto wire status codes.
fn error_response(err: &BrokerError) -> Response {
    let status = match err {
        BrokerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        BrokerError::NotFound(_) => StatusCode::NOT_FOUND,
        BrokerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        BrokerError::ResourceExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// JSON 404 for routes outside the RPC table.
pub async fn unknown_route() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "unknown route".to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[instrument(skip(state, body), fields(agent_id = %body.agent_id))]
pub async fn register(
    State(state): State<BrokerState>,
    Json(body): Json<RegisterRequest>,
) -> Response {
    match state
        .register(&body.agent_id, &body.name, &body.project, &body.path)
        .await
    {
        Ok(total_agents) => Json(RegisterResponse {
            ok: true,
            agent_id: body.agent_id,
            total_agents,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

#[instrument(skip(state))]
pub async fn list_agents(State(state): State<BrokerState>) -> Response {
    Json(AgentsResponse {
        agents: state.agents().await,
    })
    .into_response()
}

#[instrument(skip(state))]
pub async fn heartbeat(State(state): State<BrokerState>, Path(id): Path<String>) -> Response {
    match state.heartbeat(&id).await {
        Ok(()) => Json(OkResponse::new()).into_response(),
        Err(err) => error_response(&err),
    }
}

#[instrument(skip(state))]
pub async fn deregister(State(state): State<BrokerState>, Path(id): Path<String>) -> Response {
    state.deregister(&id).await;
    Json(OkResponse::new()).into_response()
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[instrument(skip(state, body), fields(from = %body.from, to = %body.to))]
pub async fn send(State(state): State<BrokerState>, Json(body): Json<SendRequest>) -> Response {
    match state
        .send(&body.from, &body.to, &body.content, body.kind)
        .await
    {
        Ok(message_id) => Json(SendResponse {
            ok: true,
            message_id,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

#[instrument(skip(state, body), fields(from = %body.from))]
pub async fn broadcast(
    State(state): State<BrokerState>,
    Json(body): Json<BroadcastRequest>,
) -> Response {
    match state.broadcast(&body.from, &body.content, body.kind).await {
        Ok(sent_to) => Json(BroadcastResponse { ok: true, sent_to }).into_response(),
        Err(err) => error_response(&err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<usize>,
}

#[instrument(skip(state))]
pub async fn read(
    State(state): State<BrokerState>,
    Path(id): Path<String>,
    Query(query): Query<ReadQuery>,
) -> Response {
    let limit = query
        .limit
        .filter(|&l| l > 0)
        .unwrap_or(limits::DEFAULT_READ_LIMIT);
    let snapshot = state.read(&id, query.unread, limit).await;
    Json(ReadResponse {
        messages: snapshot.messages,
        total: snapshot.total,
        has_more: snapshot.has_more,
    })
    .into_response()
}

#[instrument(skip(state, body))]
pub async fn ack(
    State(state): State<BrokerState>,
    Path(id): Path<String>,
    Json(body): Json<AckRequest>,
) -> Response {
    match state.ack(&id, &body.ids).await {
        Ok(acked) => Json(AckResponse { ok: true, acked }).into_response(),
        Err(err) => error_response(&err),
    }
}

#[instrument(skip(state))]
pub async fn clear_messages(
    State(state): State<BrokerState>,
    Path(id): Path<String>,
) -> Response {
    match state.clear_messages(&id).await {
        Ok(cleared) => Json(ClearResponse { ok: true, cleared }).into_response(),
        Err(err) => error_response(&err),
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

#[instrument(skip(state, body), fields(key = %body.key))]
pub async fn set_context(
    State(state): State<BrokerState>,
    Json(body): Json<SetContextRequest>,
) -> Response {
    let value = body.value.unwrap_or(serde_json::Value::Null);
    match state.set_context(&body.key, value, &body.set_by).await {
        Ok(()) => Json(SetContextResponse {
            ok: true,
            key: body.key,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

#[instrument(skip(state))]
pub async fn list_contexts(State(state): State<BrokerState>) -> Response {
    Json(ListContextsResponse {
        contexts: state.list_contexts().await,
    })
    .into_response()
}

#[instrument(skip(state))]
pub async fn get_context(State(state): State<BrokerState>, Path(key): Path<String>) -> Response {
    match state.get_context(&key).await {
        Ok(entry) => Json(ContextValueResponse {
            value: entry.value,
            set_by: entry.set_by,
            set_by_name: entry.set_by_name,
            timestamp: entry.timestamp,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

#[instrument(skip(state))]
pub async fn delete_context(
    State(state): State<BrokerState>,
    Path(key): Path<String>,
) -> Response {
    state.delete_context(&key).await;
    Json(OkResponse::new()).into_response()
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[instrument(skip(state))]
pub async fn status(State(state): State<BrokerState>) -> Response {
    Json(state.status().await).into_response()
}
