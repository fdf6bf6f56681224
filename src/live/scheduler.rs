use super::state::LiveChannel;
use crate::metrics;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drives a [`LiveChannel`] on a fixed period.
///
/// The first tick fires immediately on spawn. A failed tick is logged and the
/// next natural tick is the only retry.
#[derive(Debug, Clone)]
pub struct Scheduler {
    channel: Arc<LiveChannel>,
    period: Duration,
}

impl Scheduler {
    pub fn new(channel: Arc<LiveChannel>, period: Duration) -> Self {
        Self {
            channel,
            // tokio::time::interval panics on a zero period
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run the tick loop on a background task until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        info!(
            "Live manifest scheduler started for {} (every {:?})",
            self.channel.manifest_path().display(),
            self.period
        );

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Live manifest scheduler stopped");
                    break;
                }
                _ = interval.tick() => {}
            }

            let start = Instant::now();
            match self.channel.tick().await {
                Ok(snapshot) => {
                    debug!(
                        "Tick {} done: sequence {}, media sequence {}",
                        snapshot.ticks, snapshot.sequence, snapshot.media_sequence
                    );
                    metrics::record_tick("ok", start);
                    metrics::set_media_sequence(snapshot.media_sequence);
                }
                Err(e) => {
                    error!("Error updating manifest: {}", e);
                    metrics::record_tick("error", start);
                }
            }
        }
    }
}
