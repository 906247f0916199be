//! Worker configuration, read from the environment at startup.

use std::time::Duration;

use thiserror::Error;

use skvil_core::limits;
use skvil_core::wire::RegisterRequest;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BROKER_URL must use http or https, got '{0}'")]
    InvalidScheme(String),
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub broker_url: String,
    pub agent_id: String,
    pub agent_name: String,
    pub project: String,
    pub path: String,
    pub auto_process: bool,
    pub poll_interval: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let broker_url = env_or("BROKER_URL", "http://localhost:4800");
        validate_scheme(&broker_url)?;

        let agent_id = sanitize_agent_id(
            &std::env::var("AGENT_ID").unwrap_or_else(|_| default_hostname()),
        );
        let agent_name = env_or("AGENT_NAME", &format!("SP-{agent_id}"));
        let project = env_or("PROJECT_NAME", "unknown");
        let path = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let auto_process = std::env::var("AUTO_PROCESS")
            .map(|v| v == "true")
            .unwrap_or(false);
        let poll_interval =
            poll_interval_from(std::env::var("POLL_INTERVAL_MS").ok().as_deref());

        Ok(Self {
            broker_url,
            agent_id,
            agent_name,
            project,
            path,
            auto_process,
            poll_interval,
        })
    }

    pub fn register_request(&self) -> RegisterRequest {
        RegisterRequest {
            agent_id: self.agent_id.clone(),
            name: self.agent_name.clone(),
            project: self.project.clone(),
            path: self.path.clone(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn validate_scheme(url: &str) -> Result<(), ConfigError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidScheme(url.to_string()))
    }
}

/// Lowercase the id and replace anything outside `[a-z0-9-]` with `-`.
pub fn sanitize_agent_id(raw: &str) -> String {
    let sanitized: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "agent".to_string()
    } else {
        sanitized
    }
}

fn default_hostname() -> String {
    hostname::get().map_or_else(|_| "agent".into(), |h| h.to_string_lossy().to_string())
}

/// Anything below the minimum (or unparsable) falls back to the default.
fn poll_interval_from(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return limits::DEFAULT_POLL_INTERVAL;
    };
    match raw.parse::<u64>() {
        Ok(ms) if Duration::from_millis(ms) >= limits::MIN_POLL_INTERVAL => {
            Duration::from_millis(ms)
        }
        _ => limits::DEFAULT_POLL_INTERVAL,
    }
}
