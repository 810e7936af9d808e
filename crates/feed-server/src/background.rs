//! Background tasks for the feed server.
//!
//! Includes:
//! - Simulated live device traffic.

use feed_ledger::FeedService;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Starts the live-traffic simulation task.
///
/// Every `interval_secs` seconds, appends `batch_size` generated events to
/// the feed. Runs indefinitely; an interval of 0 disables it.
pub async fn start_simulation_task(feed: Arc<FeedService>, interval_secs: u64, batch_size: usize) {
    if interval_secs == 0 {
        tracing::warn!("simulation task disabled (interval=0)");
        return;
    }

    let interval = Duration::from_secs(interval_secs);
    tracing::info!(interval_secs, batch_size, "starting simulation task");

    loop {
        sleep(interval).await;

        match feed.append_synthetic(batch_size) {
            Ok(batch) => {
                if let Some(newest) = batch.last() {
                    tracing::debug!(
                        count = batch.len(),
                        newest_ts = newest.timestamp_millis(),
                        "simulated events appended"
                    );
                }
            }
            Err(e) if e.is_internal() => {
                tracing::error!("simulation task failed: {}", e);
            }
            Err(e) => {
                tracing::warn!("simulation batch rejected: {}", e);
            }
        }
    }
}
