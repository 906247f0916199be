//! Agent-side sidecar for the Skvil-Piertotum mesh.
//!
//! One worker runs next to each coding-agent terminal. It registers with the
//! broker, heartbeats, exposes the messaging/context tool surface to its
//! host over a stdio JSON-RPC channel, and, when autonomous mode is on,
//! polls its queue and processes messages through the host's sampling
//! capability.

pub mod client;
pub mod config;
pub mod heartbeat;
pub mod host;
pub mod processor;
pub mod prompt;
pub mod sampling;
pub mod tools;
