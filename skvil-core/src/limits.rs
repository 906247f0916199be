//! Quotas and timing constants enforced across the mesh.

use std::time::Duration;

/// Hard cap on concurrently registered agents.
pub const MAX_AGENTS: usize = 100;

/// Bound on each agent's message queue; overflow drops the oldest messages.
pub const MAX_MESSAGES_PER_AGENT: usize = 200;

/// Bound on distinct keys in the shared context store.
pub const MAX_CONTEXT_KEYS: usize = 1000;

/// Maximum serialized size of a single context value.
pub const MAX_CONTEXT_VALUE_SIZE: usize = 100 * 1024;

/// Maximum size of a message body accepted by Send/Broadcast.
pub const MAX_MESSAGE_CONTENT_SIZE: usize = 512 * 1024;

/// Agents whose last heartbeat is older than this are reaped.
/// Three heartbeat periods: tolerates one lost beat plus a slow round trip.
pub const STALE_AGENT_THRESHOLD: Duration = Duration::from_secs(90);

/// Worker heartbeat cadence.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// Broker reaper cadence.
pub const REAPER_PERIOD: Duration = Duration::from_secs(30);

/// Hard timeout on every worker RPC to the broker.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Budget for the best-effort deregister during worker shutdown.
pub const DEREGISTER_TIMEOUT: Duration = Duration::from_secs(3);

/// Autonomous poll cadence when `POLL_INTERVAL_MS` is unset or invalid.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Smallest poll cadence a worker will accept.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long worker shutdown waits for an in-flight processing pass.
pub const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

/// Read limit applied when the caller does not specify one.
pub const DEFAULT_READ_LIMIT: usize = 50;

/// Ceiling on the read limit exposed through the worker tool surface.
pub const MAX_TOOL_READ_LIMIT: usize = 50;

/// How many unread messages one autonomous pass pulls.
pub const AUTO_PROCESS_BATCH: usize = 10;

/// Output-token budget handed to the host sampling capability.
pub const SAMPLING_MAX_TOKENS: u32 = 8192;

/// Broker listen port when `BROKER_PORT` and argv are silent.
pub const DEFAULT_BROKER_PORT: u16 = 4800;
