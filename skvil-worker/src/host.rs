//! Line-delimited JSON-RPC 2.0 channel to the host coding agent over
//! stdin/stdout.
//!
//! The channel is bidirectional: the host calls our tool surface
//! (`initialize`, `tools/list`, `tools/call`, `ping`), and the worker calls
//! back into the host with `sampling/createMessage` requests whose responses
//! are routed by id. Whether the host advertised the sampling capability is
//! recorded at handshake time.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::sampling::{SampleError, SampleOutcome, SamplingHost};
use crate::tools::ToolRouter;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Sampling is an LLM round trip, not a broker RPC; it gets its own budget.
const SAMPLING_TIMEOUT: Duration = Duration::from_secs(120);

/// Any frame the host can send: a request, a notification, or a response to
/// one of our own requests.
#[derive(Debug, Deserialize)]
struct IncomingFrame {
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

type PendingReply = oneshot::Sender<Result<Value, SampleError>>;

pub struct HostChannel {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: Mutex<HashMap<u64, PendingReply>>,
    next_id: AtomicU64,
    sampling_advertised: AtomicBool,
}

impl HostChannel {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Arc<Self> {
        Arc::new(Self {
            writer: Mutex::new(Box::new(writer)),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            sampling_advertised: AtomicBool::new(false),
        })
    }

    async fn write_line(&self, frame: &Value) -> std::io::Result<()> {
        let mut line = frame.to_string();
        line.push('\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    }

    async fn respond(&self, id: Value, result: Value) {
        let frame = json!({ "jsonrpc": "2.0", "id": id, "result": result });
        if let Err(err) = self.write_line(&frame).await {
            warn!("failed to write response to host: {err}");
        }
    }

    async fn respond_error(&self, id: Value, code: i64, message: &str) {
        let frame = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        });
        if let Err(err) = self.write_line(&frame).await {
            warn!("failed to write error to host: {err}");
        }
    }

    /// Send a request to the host and wait for the matching response.
    async fn request(&self, method: &str, params: Value) -> Result<Value, SampleError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        if let Err(err) = self.write_line(&frame).await {
            self.pending.lock().await.remove(&id);
            return Err(SampleError::Transport(err.to_string()));
        }

        match tokio::time::timeout(SAMPLING_TIMEOUT, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(SampleError::Transport("host channel closed".into())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(SampleError::Timeout)
            }
        }
    }

    async fn route_response(&self, frame: IncomingFrame) {
        let Some(id) = frame.id.as_ref().and_then(Value::as_u64) else {
            debug!("response with non-numeric id, ignoring");
            return;
        };
        let Some(tx) = self.pending.lock().await.remove(&id) else {
            debug!(id, "no pending request for response, ignoring");
            return;
        };
        let outcome = match frame.error {
            Some(err) => Err(SampleError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => Ok(frame.result.unwrap_or(Value::Null)),
        };
        let _ = tx.send(outcome);
    }

    fn record_handshake(&self, params: &Value) {
        let advertised = params
            .get("capabilities")
            .and_then(|c| c.get("sampling"))
            .is_some_and(|v| !v.is_null());
        self.sampling_advertised.store(advertised, Ordering::SeqCst);
        debug!(sampling = advertised, "host initialized");
    }
}

#[async_trait]
impl SamplingHost for HostChannel {
    async fn supports_sampling(&self) -> bool {
        self.sampling_advertised.load(Ordering::SeqCst)
    }

    async fn sample(
        &self,
        prompt: &str,
        system: &str,
        max_tokens: u32,
    ) -> Result<SampleOutcome, SampleError> {
        let params = json!({
            "messages": [
                { "role": "user", "content": { "type": "text", "text": prompt } }
            ],
            "systemPrompt": system,
            "maxTokens": max_tokens,
        });
        let result = self.request("sampling/createMessage", params).await?;

        let content = &result["content"];
        match content["type"].as_str() {
            Some("text") => Ok(SampleOutcome::Text(
                content["text"].as_str().unwrap_or_default().to_string(),
            )),
            Some(other) => Ok(SampleOutcome::NonText {
                content_type: other.to_string(),
            }),
            None => Err(SampleError::Transport(
                "malformed sampling response from host".into(),
            )),
        }
    }
}

/// Read frames from the host until EOF. Requests are dispatched on their own
/// tasks so a slow tool call never stalls response routing.
pub async fn run_host_loop(
    channel: Arc<HostChannel>,
    tools: Arc<ToolRouter>,
    reader: impl AsyncRead + Unpin,
) {
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let frame: IncomingFrame = match serde_json::from_str(trimmed) {
                    Ok(frame) => frame,
                    Err(_) => {
                        debug!(line = trimmed, "ignoring non-JSON-RPC line from host");
                        continue;
                    }
                };

                if let Some(method) = frame.method.clone() {
                    match frame.id.clone() {
                        Some(id) => {
                            let channel = channel.clone();
                            let tools = tools.clone();
                            tokio::spawn(async move {
                                handle_request(channel, tools, &method, id, frame.params).await;
                            });
                        }
                        None => {
                            // Notifications need no reply.
                            debug!(method = %method, "host notification");
                        }
                    }
                } else {
                    channel.route_response(frame).await;
                }
            }
            Ok(None) => {
                debug!("host closed the channel");
                return;
            }
            Err(err) => {
                warn!("host channel read failed: {err}");
                return;
            }
        }
    }
}

async fn handle_request(
    channel: Arc<HostChannel>,
    tools: Arc<ToolRouter>,
    method: &str,
    id: Value,
    params: Value,
) {
    match method {
        "initialize" => {
            channel.record_handshake(&params);
            channel
                .respond(
                    id,
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": { "tools": {} },
                        "serverInfo": {
                            "name": "skvil-worker",
                            "version": env!("CARGO_PKG_VERSION"),
                        }
                    }),
                )
                .await;
        }
        "ping" => {
            channel.respond(id, json!({})).await;
        }
        "tools/list" => {
            channel
                .respond(id, json!({ "tools": ToolRouter::definitions() }))
                .await;
        }
        "tools/call" => {
            let name = params["name"].as_str().unwrap_or_default().to_string();
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
            match tools.dispatch(&name, &arguments).await {
                Ok(result) => {
                    channel
                        .respond(
                            id,
                            json!({
                                "content": [{ "type": "text", "text": result.to_string() }],
                                "isError": false,
                            }),
                        )
                        .await;
                }
                Err(message) => {
                    channel
                        .respond(
                            id,
                            json!({
                                "content": [{ "type": "text", "text": message }],
                                "isError": true,
                            }),
                        )
                        .await;
                }
            }
        }
        other => {
            channel
                .respond_error(id, -32601, &format!("Method not found: {other}"))
                .await;
        }
    }
}
