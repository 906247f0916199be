use tokio::sync::watch;
use tracing::info;

use skvil_core::limits;

use crate::state::BrokerState;

/// Periodic sweep that evicts agents whose last heartbeat is older than the
/// staleness threshold. Heartbeat failure alone never evicts; this task is
/// the only time-based eviction mechanism.
///
/// Runs until the shutdown channel flips to true.
pub async fn run_reaper(state: BrokerState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(limits::REAPER_PERIOD);
    // The first tick fires immediately; skip it so a freshly started broker
    // does not sweep before anyone has had a chance to heartbeat.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = state.reap_stale().await;
                for agent_id in &evicted {
                    info!(agent_id = %agent_id, "reaped stale agent");
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
