use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use skvil_core::limits;

use crate::client::BrokerClient;
use crate::config::WorkerConfig;

/// Heartbeat ticker. Runs until the shutdown channel flips.
pub async fn run_heartbeat(
    client: Arc<BrokerClient>,
    config: WorkerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(limits::HEARTBEAT_PERIOD);
    // Registration just happened; skip the immediate first tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                heartbeat_once(&client, &config).await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// One heartbeat attempt. The worker is the authoritative source of truth
/// for its own registration: if the broker answers "not registered" (it was
/// restarted, or the reaper got us), re-register on the spot.
pub async fn heartbeat_once(client: &BrokerClient, config: &WorkerConfig) {
    match client.heartbeat().await {
        Ok(_) => {}
        Err(err) if err.is_not_registered() => {
            info!("broker lost our registration, re-registering");
            match client.register(&config.register_request()).await {
                Ok(_) => info!(agent_id = %config.agent_id, "re-registered"),
                Err(err) => warn!("re-register failed: {err}"),
            }
        }
        Err(err) => {
            debug!("heartbeat failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use skvil_broker::{BrokerState, broker_router};
    use skvil_core::message::MessageKind;

    fn test_config(base: &str) -> WorkerConfig {
        WorkerConfig {
            broker_url: base.to_string(),
            agent_id: "w".to_string(),
            agent_name: "Worker".to_string(),
            project: "test".to_string(),
            path: String::new(),
            auto_process: false,
            poll_interval: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn recovers_registration_after_broker_restart() {
        let state = BrokerState::new();
        let router = broker_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        let base = format!("http://{addr}");

        let config = test_config(&base);
        let client = BrokerClient::new(&base, "w").expect("client");
        client
            .register(&config.register_request())
            .await
            .expect("initial register");
        heartbeat_once(&client, &config).await;

        // Simulate a broker restart by wiping the registration server-side.
        state.deregister("w").await;
        assert!(
            client
                .heartbeat()
                .await
                .expect_err("heartbeat after wipe")
                .is_not_registered()
        );

        // The next heartbeat tick re-registers and delivery resumes.
        heartbeat_once(&client, &config).await;
        let peer = BrokerClient::new(&base, "peer").expect("peer client");
        peer.register(&skvil_core::wire::RegisterRequest {
            agent_id: "peer".into(),
            name: "Peer".into(),
            project: "test".into(),
            path: String::new(),
        })
        .await
        .expect("peer register");
        peer.send("w", "welcome back", MessageKind::Text)
            .await
            .expect("send to recovered worker");

        let unread = client.read(true, 50).await.expect("read");
        assert_eq!(unread.messages.len(), 1);
        assert_eq!(unread.messages[0].content, "welcome back");
    }
}
