//! Prometheus metrics for the live scheduler and the ad splicer.
//!
//! The recorder is installed once per process; later calls reuse the same
//! handle so routers can be built repeatedly (tests do this).

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::warn;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder (idempotent) and return its handle.
pub fn init() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                warn!("Metrics recorder already installed: {}", e);
            }
            handle
        })
        .clone()
}

/// Record the outcome of one scheduler tick.
pub fn record_tick(outcome: &'static str, start: Instant) {
    counter!("livehls_ticks_total", "outcome" => outcome).increment(1);
    histogram!("livehls_tick_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn set_media_sequence(media_sequence: u64) {
    gauge!("livehls_media_sequence").set(media_sequence as f64);
}

/// Count an ad break by insertion path (`preroll`, `midroll`, `cue`).
pub fn record_ad_break(path: &'static str) {
    counter!("livehls_ad_breaks_total", "path" => path).increment(1);
}

/// Count a scanned cue by classification result.
pub fn record_splice_cue(result: &'static str) {
    counter!("livehls_splice_cues_total", "result" => result).increment(1);
}
