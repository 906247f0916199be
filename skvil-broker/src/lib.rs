//! Broker side of the Skvil-Piertotum mesh: the in-memory state engine, the
//! HTTP RPC surface that fronts it, the stale-agent reaper, and the operator
//! console.

pub mod console;
pub mod engine;
pub mod handlers;
pub mod reaper;
pub mod router;
pub mod state;

pub use router::broker_router;
pub use state::BrokerState;
