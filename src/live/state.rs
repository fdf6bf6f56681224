//! Sliding-window live manifest state.
//!
//! A channel cycles through a finite catalog of content segments. Every tick
//! renders a playlist exposing `window_size` consecutive catalog entries,
//! with a pre-roll on the first render and mid-roll breaks after every
//! `ad_cadence`-th catalog entry, then moves the window forward by one.

use crate::ad::{AD_CHUNK_SECS, AdBreak, format_duration};
use crate::config::Config;
use crate::error::{LivehlsError, Result};
use crate::metrics;
use crate::persist::write_atomic;
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Build the URI of a content catalog entry (1-based).
pub fn content_segment_uri(catalog_index: u64) -> String {
    format!("/media/1080p/segment_{:03}.ts", catalog_index)
}

/// Fixed parameters of one live channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    /// Content entries visible per render
    pub window_size: u64,
    /// Size of the content catalog being cycled through
    pub total_segments: u64,
    /// EXTINF duration of content entries
    pub segment_duration: f64,
    pub ad_id: String,
    /// Seconds per ad break, pre-roll and mid-roll alike
    pub ad_duration: f64,
    /// Mid-roll after every catalog index divisible by this; 0 disables
    pub ad_cadence: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            window_size: 10,
            total_segments: 59,
            segment_duration: 10.0,
            ad_id: "adv1".to_string(),
            ad_duration: 30.0,
            ad_cadence: 10,
        }
    }
}

impl From<&Config> for ChannelSettings {
    fn from(config: &Config) -> Self {
        Self {
            window_size: config.window_size,
            total_segments: config.total_segments,
            segment_duration: config.segment_duration,
            ad_id: config.ad_id.clone(),
            ad_duration: config.ad_duration as f64,
            ad_cadence: config.ad_cadence,
        }
    }
}

/// One rendered playlist snapshot plus the bookkeeping needed to advance.
#[derive(Debug, Clone)]
pub struct RenderedManifest {
    pub text: String,
    pub media_sequence: u64,
    pub preroll: bool,
    pub midrolls: usize,
    /// Entries that drop off the front of the playlist on the next tick
    pub evicted_on_advance: u64,
}

#[derive(Debug, Clone)]
pub struct LiveManifestState {
    settings: ChannelSettings,
    /// Window start cursor, wraps modulo `total_segments`
    sequence: u64,
    /// Absolute id of the first playlist entry, never wraps
    media_sequence: u64,
    ticks: u64,
}

impl LiveManifestState {
    pub fn new(settings: ChannelSettings) -> Self {
        Self {
            settings,
            sequence: 0,
            media_sequence: 0,
            ticks: 0,
        }
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn media_sequence(&self) -> u64 {
        self.media_sequence
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn target_duration(&self) -> u64 {
        self.settings.segment_duration.max(AD_CHUNK_SECS).ceil() as u64
    }

    /// Catalog index (1-based) shown at absolute window position `position`.
    pub fn catalog_index(&self, position: u64) -> u64 {
        (position.saturating_sub(1) % self.settings.total_segments.max(1)) + 1
    }

    /// Catalog indices of the current window, in playlist order.
    pub fn window(&self) -> impl Iterator<Item = u64> + '_ {
        let start = self.sequence + 1;
        (start..start + self.settings.window_size).map(|p| self.catalog_index(p))
    }

    fn is_midroll_point(&self, catalog_index: u64) -> bool {
        self.settings.ad_cadence > 0 && catalog_index % self.settings.ad_cadence == 0
    }

    /// Render the playlist for the current window without changing state.
    pub fn render(&self) -> RenderedManifest {
        let ad_break = AdBreak::new(&self.settings.ad_id, self.settings.ad_duration);
        let ad_entries = ad_break.segments.len() as u64;

        let mut text = String::with_capacity(4096);
        let _ = writeln!(text, "#EXTM3U");
        let _ = writeln!(text, "#EXT-X-VERSION:3");
        let _ = writeln!(text, "#EXT-X-TARGETDURATION:{}", self.target_duration());
        let _ = writeln!(text, "#EXT-X-MEDIA-SEQUENCE:{}", self.media_sequence);

        let preroll = self.ticks == 0 && !ad_break.is_empty();
        let mut entries: u64 = 0;
        let mut evicted_on_advance = None;
        let mut midrolls = 0;

        if preroll {
            ad_break.render_into(&mut text);
            entries += ad_entries;
        }

        for (offset, catalog_index) in self.window().enumerate() {
            if offset == 1 {
                evicted_on_advance = Some(entries);
            }

            let _ = writeln!(
                text,
                "#EXTINF:{},",
                format_duration(self.settings.segment_duration)
            );
            let _ = writeln!(text, "{}", content_segment_uri(catalog_index));
            entries += 1;

            if self.is_midroll_point(catalog_index) && !ad_break.is_empty() {
                ad_break.render_into(&mut text);
                entries += ad_entries;
                midrolls += 1;
            }
        }

        RenderedManifest {
            text,
            media_sequence: self.media_sequence,
            preroll,
            midrolls,
            evicted_on_advance: evicted_on_advance.unwrap_or(entries),
        }
    }

    /// Move the window forward one position after `rendered` was produced.
    pub fn advance(&mut self, rendered: &RenderedManifest) {
        self.sequence = (self.sequence + 1) % self.settings.total_segments.max(1);
        self.media_sequence += rendered.evicted_on_advance;
        self.ticks += 1;
    }
}

/// Point-in-time view of a channel for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub sequence: u64,
    pub media_sequence: u64,
    pub ticks: u64,
}

/// A live manifest state bound to the file it is published to.
#[derive(Debug)]
pub struct LiveChannel {
    state: Mutex<LiveManifestState>,
    manifest_path: PathBuf,
}

impl LiveChannel {
    pub fn new(state: LiveManifestState, manifest_path: PathBuf) -> Self {
        Self {
            state: Mutex::new(state),
            manifest_path,
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Render the current window, publish it, and advance.
    ///
    /// The state lock is held for the whole tick. The window advances even
    /// when publishing fails, so a failed write only delays the file.
    pub async fn tick(&self) -> Result<ChannelSnapshot> {
        let mut state = self.state.lock().await;
        let rendered = state.render();

        let persisted = write_atomic(&self.manifest_path, rendered.text.as_bytes())
            .await
            .map_err(|source| LivehlsError::Persist {
                path: self.manifest_path.clone(),
                source,
            });

        state.advance(&rendered);

        persisted?;

        if rendered.preroll {
            metrics::record_ad_break("preroll");
        }
        for _ in 0..rendered.midrolls {
            metrics::record_ad_break("midroll");
        }

        debug!(
            "Published {} (media sequence {}, {} mid-rolls)",
            self.manifest_path.display(),
            rendered.media_sequence,
            rendered.midrolls
        );
        if rendered.preroll {
            info!("Published first live window with pre-roll");
        }

        Ok(ChannelSnapshot {
            sequence: state.sequence(),
            media_sequence: state.media_sequence(),
            ticks: state.ticks(),
        })
    }

    pub async fn snapshot(&self) -> ChannelSnapshot {
        let state = self.state.lock().await;
        ChannelSnapshot {
            sequence: state.sequence(),
            media_sequence: state.media_sequence(),
            ticks: state.ticks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad::test_support::assert_breaks_well_formed;

    fn settings(window_size: u64, total_segments: u64) -> ChannelSettings {
        ChannelSettings {
            window_size,
            total_segments,
            ..Default::default()
        }
    }

    fn content_indices(text: &str) -> Vec<u64> {
        text.lines()
            .filter_map(|l| l.strip_prefix("/media/1080p/segment_"))
            .filter_map(|l| l.strip_suffix(".ts"))
            .map(|n| n.parse().unwrap())
            .collect()
    }

    #[test]
    fn first_tick_has_preroll_then_window() {
        let state = LiveManifestState::new(settings(5, 59));
        let rendered = state.render();
        let lines: Vec<&str> = rendered.text.lines().collect();

        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXT-X-VERSION:3");
        assert_eq!(lines[2], "#EXT-X-TARGETDURATION:10");
        assert_eq!(lines[3], "#EXT-X-MEDIA-SEQUENCE:0");
        assert_eq!(lines[4], "#EXT-X-DISCONTINUITY");
        assert_eq!(lines[5], "#EXT-X-CUE-OUT:DURATION=30");
        assert!(rendered.preroll);
        assert_eq!(rendered.text.matches("/ads/adv1/1080p/segment_").count(), 3);
        assert_eq!(content_indices(&rendered.text), vec![1, 2, 3, 4, 5]);
        assert_breaks_well_formed(&rendered.text);
    }

    #[test]
    fn second_tick_slides_window_without_preroll() {
        let mut state = LiveManifestState::new(settings(5, 59));
        let first = state.render();
        state.advance(&first);

        let second = state.render();
        assert!(!second.preroll);
        assert!(!second.text.contains("#EXT-X-CUE-OUT"));
        assert_eq!(content_indices(&second.text), vec![2, 3, 4, 5, 6]);
        // three pre-roll entries plus content 1 dropped off the front
        assert!(second.text.contains("#EXT-X-MEDIA-SEQUENCE:4\n"));
    }

    #[test]
    fn window_wraps_around_catalog() {
        let mut state = LiveManifestState::new(settings(5, 7));
        for _ in 0..5 {
            let rendered = state.render();
            state.advance(&rendered);
        }
        assert_eq!(state.sequence(), 5);
        assert_eq!(content_indices(&state.render().text), vec![6, 7, 1, 2, 3]);
    }

    #[test]
    fn sequence_after_n_ticks_is_n_mod_total() {
        let mut state = LiveManifestState::new(settings(3, 4));
        for n in 1..=10u64 {
            let rendered = state.render();
            state.advance(&rendered);
            assert_eq!(state.sequence(), n % 4);
            assert_eq!(state.ticks(), n);
        }
    }

    #[test]
    fn every_render_has_window_size_content_entries() {
        let mut state = LiveManifestState::new(settings(10, 59));
        for _ in 0..120 {
            let rendered = state.render();
            let indices = content_indices(&rendered.text);
            let expected: Vec<u64> = (state.sequence() + 1..=state.sequence() + 10)
                .map(|i| ((i - 1) % 59) + 1)
                .collect();
            assert_eq!(indices, expected);
            assert_breaks_well_formed(&rendered.text);
            state.advance(&rendered);
        }
    }

    #[test]
    fn midroll_follows_cadence_entries() {
        let mut state = LiveManifestState::new(settings(5, 59));
        for _ in 0..7 {
            let rendered = state.render();
            state.advance(&rendered);
        }
        // window 8..=12 contains catalog entry 10
        let rendered = state.render();
        assert_eq!(rendered.midrolls, 1);
        let lines: Vec<&str> = rendered.text.lines().collect();
        let pos = lines
            .iter()
            .position(|l| *l == "/media/1080p/segment_010.ts")
            .unwrap();
        assert_eq!(lines[pos + 1], "#EXT-X-DISCONTINUITY");
        assert_eq!(lines[pos + 2], "#EXT-X-CUE-OUT:DURATION=30");
        assert_breaks_well_formed(&rendered.text);
    }

    #[test]
    fn media_sequence_counts_midroll_entries() {
        let mut state = LiveManifestState::new(settings(3, 59));
        // advance until catalog entry 10 leads the window
        while state.window().next() != Some(10) {
            let rendered = state.render();
            state.advance(&rendered);
        }
        let before = state.media_sequence();
        let rendered = state.render();
        state.advance(&rendered);
        assert_eq!(state.media_sequence(), before + 1 + 3);
    }

    #[test]
    fn zero_cadence_disables_midrolls() {
        let mut state = LiveManifestState::new(ChannelSettings {
            window_size: 20,
            ad_cadence: 0,
            ..Default::default()
        });
        let first = state.render();
        state.advance(&first);
        let rendered = state.render();
        assert_eq!(rendered.midrolls, 0);
        assert!(!rendered.text.contains("CUE-OUT"));
    }

    #[test]
    fn content_duration_is_written_exactly() {
        let state = LiveManifestState::new(ChannelSettings {
            window_size: 2,
            segment_duration: 2.25,
            ..Default::default()
        });
        let text = state.render().text;
        assert_eq!(text.matches("#EXTINF:2.25,\n").count(), 2);

        let state = LiveManifestState::new(ChannelSettings {
            window_size: 2,
            segment_duration: 6.0,
            ..Default::default()
        });
        assert_eq!(state.render().text.matches("#EXTINF:6.0,\n").count(), 2);
    }

    #[test]
    fn zero_ad_duration_renders_no_breaks() {
        let state = LiveManifestState::new(ChannelSettings {
            ad_duration: 0.0,
            ..Default::default()
        });
        let rendered = state.render();
        assert!(!rendered.preroll);
        assert!(!rendered.text.contains("DISCONTINUITY"));
        assert_eq!(rendered.evicted_on_advance, 1);
    }

    #[tokio::test]
    async fn tick_publishes_and_advances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifests").join("live.m3u8");
        let channel = LiveChannel::new(LiveManifestState::new(settings(5, 59)), path.clone());

        let snapshot = channel.tick().await.unwrap();
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.ticks, 1);

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("#EXT-X-CUE-OUT:DURATION=30"));
        assert_eq!(content_indices(&text), vec![1, 2, 3, 4, 5]);

        channel.tick().await.unwrap();
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content_indices(&text), vec![2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn failed_publish_still_advances() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, b"x").await.unwrap();

        let channel = LiveChannel::new(
            LiveManifestState::new(settings(5, 59)),
            blocker.join("live.m3u8"),
        );

        let err = channel.tick().await.unwrap_err();
        assert!(matches!(err, LivehlsError::Persist { .. }));
        assert_eq!(channel.snapshot().await.sequence, 1);
    }
}
