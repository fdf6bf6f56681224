use crate::{config::Config, live::LiveChannel};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Live channel driven by the scheduler, read for health reporting
    pub channel: Arc<LiveChannel>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
    /// Wall-clock start time reported by `/health`
    pub started_at_utc: DateTime<Utc>,
    /// Prometheus recorder handle backing `/metrics`
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create a new AppState with the given configuration and channel
    pub fn new(config: Config, channel: Arc<LiveChannel>) -> Self {
        Self {
            config: Arc::new(config),
            channel,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            metrics: crate::metrics::init(),
        }
    }
}
