use std::fmt::Write;
use tracing::debug;

/// Length of every ad chunk except a shorter trailing one.
pub const AD_CHUNK_SECS: f64 = 10.0;

/// A single ad segment within a break
#[derive(Debug, Clone, PartialEq)]
pub struct AdSegment {
    /// URI of the ad segment
    pub uri: String,
    /// Duration of the segment in seconds
    pub duration: f64,
}

/// Format a duration for `#EXTINF`, always with a decimal point.
///
/// Values are kept to millisecond precision so chunk arithmetic residue
/// (`5.399999999999999`) prints as `5.4` while `2.25` stays `2.25`.
pub fn format_duration(secs: f64) -> String {
    let fixed = format!("{:.3}", secs);
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Build the URI of the `index`-th chunk of an ad creative.
pub fn ad_segment_uri(ad_id: &str, index: usize) -> String {
    format!("/ads/{}/1080p/segment_{:03}.ts", ad_id, index)
}

/// Chunk an ad of `total_duration` seconds into [`AD_CHUNK_SECS`] pieces.
///
/// Every chunk is full length except the last, which carries whatever is
/// left so the durations sum to `total_duration`. Non-positive or
/// non-finite durations yield no segments.
pub fn generate(ad_id: &str, total_duration: f64) -> Vec<AdSegment> {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Vec::new();
    }

    let mut segments = Vec::with_capacity((total_duration / AD_CHUNK_SECS).ceil() as usize);
    let mut remaining = total_duration;

    while remaining > 0.0 {
        let duration = remaining.min(AD_CHUNK_SECS);
        segments.push(AdSegment {
            uri: ad_segment_uri(ad_id, segments.len()),
            duration,
        });
        remaining -= duration;
    }

    debug!(
        "Generated {} ad segments for {} ({}s)",
        segments.len(),
        ad_id,
        total_duration
    );

    segments
}

/// One ad break: the chunked ad segments plus the duration declared in CUE-OUT.
#[derive(Debug, Clone, PartialEq)]
pub struct AdBreak {
    pub ad_id: String,
    pub duration: f64,
    pub segments: Vec<AdSegment>,
}

impl AdBreak {
    pub fn new(ad_id: &str, duration: f64) -> Self {
        Self {
            ad_id: ad_id.to_string(),
            duration,
            segments: generate(ad_id, duration),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Duration as written into `#EXT-X-CUE-OUT:DURATION=`.
    ///
    /// Rounded up so the declared break always covers its segments.
    pub fn declared_duration(&self) -> u64 {
        let total: f64 = self.segments.iter().map(|s| s.duration).sum();
        // strip float residue before rounding up (25.000000000000004 -> 25)
        let total = (total * 1000.0).round() / 1000.0;
        total.ceil().max(0.0) as u64
    }

    /// Value of the `EXT-X-CUE-OUT` tag without the tag name.
    pub fn cue_out_attributes(&self) -> String {
        format!("DURATION={}", self.declared_duration())
    }

    /// Append the break's tag block to a playlist being rendered.
    ///
    /// Layout: discontinuity, cue-out, the ad entries, discontinuity, cue-in.
    /// An empty break writes nothing.
    pub fn render_into(&self, playlist: &mut String) {
        if self.is_empty() {
            return;
        }

        let _ = writeln!(playlist, "#EXT-X-DISCONTINUITY");
        let _ = writeln!(playlist, "#EXT-X-CUE-OUT:{}", self.cue_out_attributes());
        for segment in &self.segments {
            let _ = writeln!(playlist, "#EXTINF:{},", format_duration(segment.duration));
            let _ = writeln!(playlist, "{}", segment.uri);
        }
        let _ = writeln!(playlist, "#EXT-X-DISCONTINUITY");
        let _ = writeln!(playlist, "#EXT-X-CUE-IN");
    }
}
