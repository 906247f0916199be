//! Shared data model and wire contracts for the Skvil-Piertotum broker mesh.
//!
//! Everything the broker daemon and the agent workers agree on lives here:
//! the agent/message/context records, the quota table, the broker error
//! taxonomy, and the HTTP request/response bodies.

pub mod agent;
pub mod context;
pub mod error;
pub mod limits;
pub mod message;
pub mod wire;

pub use agent::Agent;
pub use context::ContextEntry;
pub use error::BrokerError;
pub use message::{BROKER_SENDER, BROKER_SENDER_NAME, Message, MessageKind};
