use axum::Router;
use axum::routing::{delete, get, post};

use crate::handlers;
use crate::state::BrokerState;

/// Build the broker axum Router with the full RPC surface.
pub fn broker_router(state: BrokerState) -> Router {
    Router::new()
        .route("/agents/register", post(handlers::register))
        .route("/agents", get(handlers::list_agents))
        .route("/agents/{id}/heartbeat", post(handlers::heartbeat))
        .route("/agents/{id}", delete(handlers::deregister))
        .route("/messages/send", post(handlers::send))
        .route("/messages/broadcast", post(handlers::broadcast))
        .route(
            "/messages/{id}",
            get(handlers::read).delete(handlers::clear_messages),
        )
        .route("/messages/{id}/ack", post(handlers::ack))
        .route(
            "/context",
            post(handlers::set_context).get(handlers::list_contexts),
        )
        .route(
            "/context/{key}",
            get(handlers::get_context).delete(handlers::delete_context),
        )
        .route("/status", get(handlers::status))
        .fallback(handlers::unknown_route)
        .with_state(state)
}
