//! The host coding-agent runtime, as seen by the worker.
//!
//! Sampling is the only capability the worker consumes from its host; the
//! seam is a trait so the autonomous loop can be exercised against scripted
//! doubles.

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of a successful sampling call.
#[derive(Debug, Clone)]
pub enum SampleOutcome {
    Text(String),
    /// The host answered with a payload the worker cannot relay as text.
    NonText { content_type: String },
}

#[derive(Debug, Error)]
pub enum SampleError {
    /// The host returned a JSON-RPC error object.
    #[error("sampling error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The channel to the host broke mid-call.
    #[error("sampling transport error: {0}")]
    Transport(String),

    /// The host did not answer within the sampling budget.
    #[error("sampling timed out")]
    Timeout,
}

const CAPABILITY_HINTS: [&str; 3] = ["-32601", "Method not found", "does not support sampling"];

impl SampleError {
    /// Whether this failure means the host cannot sample at all, as opposed
    /// to a transient failure worth reporting back to the sender.
    pub fn is_capability_missing(&self) -> bool {
        let text = self.to_string();
        CAPABILITY_HINTS.iter().any(|hint| text.contains(hint))
    }
}

#[async_trait]
pub trait SamplingHost: Send + Sync {
    /// Whether the host advertised the sampling capability at handshake.
    async fn supports_sampling(&self) -> bool;

    /// Delegate a completion to the host.
    async fn sample(
        &self,
        prompt: &str,
        system: &str,
        max_tokens: u32,
    ) -> Result<SampleOutcome, SampleError>;
}
