//! Autonomous message processing.
//!
//! When enabled, the worker polls its queue, runs each unread message
//! through the host's sampling capability, replies to the sender, and acks.
//! Processing failures are acked too, so a message that always fails cannot
//! block the queue. The only event that turns the loop off by itself is the
//! host revealing it cannot sample at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use skvil_core::limits;
use skvil_core::message::{BROKER_SENDER, Message, MessageKind};

use crate::client::BrokerClient;
use crate::prompt;
use crate::sampling::{SampleOutcome, SamplingHost};

/// Control message that clears the worker's task status without sampling.
static RESET_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RESET[\s:]").expect("reset pattern is valid"));

const RESET_REPLY: &str = "RESET ACK | nenhuma tarefa ativa no momento";
const NO_CAPABILITY_REASON: &str = "client did not advertise sampling capability";

pub struct AutoProcessor {
    client: Arc<BrokerClient>,
    host: Arc<dyn SamplingHost>,
    poll_interval: Duration,
    enabled: AtomicBool,
    /// Single-flight guard. Taken synchronously at tick entry, before the
    /// first suspension point, so an overlapping tick bails cleanly.
    processing: AtomicBool,
    loop_running: AtomicBool,
    disable_reason: StdMutex<Option<String>>,
}

impl AutoProcessor {
    pub fn new(
        client: Arc<BrokerClient>,
        host: Arc<dyn SamplingHost>,
        poll_interval: Duration,
        enabled: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            host,
            poll_interval,
            enabled: AtomicBool::new(enabled),
            processing: AtomicBool::new(false),
            loop_running: AtomicBool::new(false),
            disable_reason: StdMutex::new(None),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn disable_reason(&self) -> Option<String> {
        self.disable_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Enable and start the poll loop if it is not already running.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) {
        self.enabled.store(true, Ordering::SeqCst);
        *self
            .disable_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;

        if self.loop_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.run_loop(shutdown).await;
            this.loop_running.store(false, Ordering::SeqCst);
        });
    }

    /// Turn the loop off. An in-flight pass finishes its current message
    /// batch; the loop exits at the next tick.
    pub fn stop(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    fn disable(&self, reason: &str) {
        warn!(reason = %reason, "disabling autonomous processing");
        self.enabled.store(false, Ordering::SeqCst);
        *self
            .disable_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(reason.to_string());
    }

    async fn run_loop(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?self.poll_interval, "autonomous processing started");
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.is_enabled() {
                        return;
                    }
                    self.tick().await;
                    if !self.is_enabled() {
                        info!("autonomous processing stopped");
                        return;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    /// One poll pass. Re-entrant calls return immediately.
    pub async fn tick(&self) {
        if self.processing.swap(true, Ordering::SeqCst) {
            return;
        }
        self.process_batch().await;
        self.processing.store(false, Ordering::SeqCst);
    }

    async fn process_batch(&self) {
        if !self.host.supports_sampling().await {
            self.disable(NO_CAPABILITY_REASON);
            return;
        }

        let batch = match self.client.read(true, limits::AUTO_PROCESS_BATCH).await {
            Ok(response) => response.messages,
            Err(err) => {
                // Broker unreachable; the next tick retries.
                debug!("poll failed: {err}");
                return;
            }
        };

        for message in batch {
            if RESET_COMMAND.is_match(&message.content) {
                self.set_status("idle").await;
                self.reply(&message, RESET_REPLY, MessageKind::Text).await;
                self.ack(&message).await;
                continue;
            }

            self.set_status(&busy_status(&message.content)).await;

            let nonce = prompt::generate_nonce();
            let text = prompt::build_prompt(&message, &nonce);
            match self
                .host
                .sample(&text, prompt::WORKER_SYSTEM_PROMPT, limits::SAMPLING_MAX_TOKENS)
                .await
            {
                Ok(SampleOutcome::Text(reply)) => {
                    self.reply(&message, &reply, message.kind.reply_kind()).await;
                }
                Ok(SampleOutcome::NonText { content_type }) => {
                    let stub =
                        format!("[resposta com conteúdo '{content_type}' não suportado]");
                    self.reply(&message, &stub, MessageKind::Text).await;
                }
                Err(err) if err.is_capability_missing() => {
                    // The capability is gone; a reply would fail the same
                    // way. This message stays unACKed and is picked up
                    // again if the loop is re-enabled.
                    self.disable(&err.to_string());
                    break;
                }
                Err(err) => {
                    self.reply(&message, &format!("ERROR: {err}"), MessageKind::Text)
                        .await;
                }
            }

            self.set_status("idle").await;
            self.ack(&message).await;
        }
    }

    /// Reply to the sender, unless the sender is the operator or ourselves
    /// (a self-reply would loop straight back through this processor).
    async fn reply(&self, message: &Message, content: &str, kind: MessageKind) {
        if message.from == BROKER_SENDER || message.from == self.client.agent_id() {
            return;
        }
        if let Err(err) = self.client.send(&message.from, content, kind).await {
            debug!(to = %message.from, "reply failed: {err}");
        }
    }

    /// ACK exactly once per processing attempt, success or failure alike;
    /// this is what keeps a poison message from wedging the queue.
    async fn ack(&self, message: &Message) {
        if let Err(err) = self.client.ack(std::slice::from_ref(&message.id)).await {
            warn!(message_id = %message.id, "ack failed: {err}");
        }
    }

    /// Best-effort status context write; never affects the message path.
    async fn set_status(&self, status: &str) {
        let key = format!("{}-status", self.client.agent_id());
        if let Err(err) = self
            .client
            .set_context(&key, serde_json::Value::String(status.to_string()))
            .await
        {
            debug!("status update failed: {err}");
        }
    }
}

fn busy_status(content: &str) -> String {
    let task: String = content.chars().take(60).collect();
    format!(
        "busy | task: {task} | início: {}",
        Utc::now().format("%H:%M:%S")
    )
}
