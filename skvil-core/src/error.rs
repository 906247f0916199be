use thiserror::Error;

/// Broker-side error taxonomy.
///
/// The transport mapping (HTTP status codes) lives with the RPC surface;
/// this crate stays transport-free so the engine can be tested directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// A required field is missing, empty, or malformed.
    #[error("{0}")]
    InvalidArgument(String),

    /// The named agent or context key is not known to the broker.
    #[error("{0}")]
    NotFound(String),

    /// A quota (agent count, context keys) is exhausted.
    #[error("{0}")]
    ResourceExhausted(String),

    /// A size bound (message content, context value) was exceeded.
    #[error("{0}")]
    PayloadTooLarge(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_displays_bare_message() {
        let err = BrokerError::NotFound("agent 'zeta' is not registered".into());
        assert_eq!(err.to_string(), "agent 'zeta' is not registered");
    }
}
