use std::sync::Arc;
use std::time::Duration;

use smartrag_events::ConnectionRegistry;
use tokio_util::sync::CancellationToken;

/// Spawn a background task that queues a Ping frame for every connected
/// WebSocket client each `interval`.
///
/// Connections whose queue rejects the ping are dropped by the registry.
/// The task stops when `cancel` is triggered. `interval` must be non-zero.
pub fn start_heartbeat(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let reached = registry.ping_all().await;
                    tracing::debug!(count = reached, "WebSocket heartbeat ping");
                }
            }
        }
        tracing::debug!("Heartbeat stopped");
    })
}
