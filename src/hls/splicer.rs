//! Cue-driven ad insertion over a persisted playlist.
//!
//! Scans a media playlist for segments carrying SCTE-35 cues and splices an
//! ad break in front of every segment whose cue is a `splice_insert`.

use crate::ad::AdBreak;
use crate::error::Result;
use crate::hls::document::{PlaylistDocument, closes_ad_break, segment_cue};
use crate::metrics;
use crate::scte35::{CueDecoder, Scte35Decoder, is_splice_insert};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of one splicing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpliceReport {
    /// Segments carrying a cue tag
    pub cues_seen: usize,
    /// Cues that failed to decode and were skipped
    pub cues_rejected: usize,
    /// Ad breaks spliced in
    pub breaks_inserted: usize,
    /// Total ad entries added to the playlist
    pub segments_added: usize,
}

pub struct AdSplicer<D = Scte35Decoder> {
    decoder: D,
}

impl AdSplicer<Scte35Decoder> {
    pub fn new() -> Self {
        Self {
            decoder: Scte35Decoder,
        }
    }
}

impl Default for AdSplicer<Scte35Decoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: CueDecoder> AdSplicer<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self { decoder }
    }

    /// Load `playlist_path`, splice ads at every splice-insert cue, save it back.
    ///
    /// Load and save failures abort the operation. A cue that fails to decode
    /// only skips its own segment.
    pub async fn insert_ads(
        &self,
        playlist_path: &Path,
        ad_id: &str,
        ad_duration: f64,
    ) -> Result<SpliceReport> {
        let mut document = PlaylistDocument::load(playlist_path).await?;
        let report = self.splice_document(&mut document, ad_id, ad_duration);
        document.save(playlist_path).await?;

        info!(
            "Spliced {} ad breaks ({} segments) into {}; {} cues seen, {} rejected",
            report.breaks_inserted,
            report.segments_added,
            playlist_path.display(),
            report.cues_seen,
            report.cues_rejected
        );
        Ok(report)
    }

    /// Splice ads into an already loaded document.
    pub fn splice_document(
        &self,
        document: &mut PlaylistDocument,
        ad_id: &str,
        ad_duration: f64,
    ) -> SpliceReport {
        let mut report = SpliceReport::default();
        let mut splice_points = Vec::new();

        for (index, segment) in document.media_segments().iter().enumerate() {
            let Some(payload) = segment_cue(segment) else {
                continue;
            };
            report.cues_seen += 1;

            if closes_ad_break(segment) {
                debug!("Segment {} already follows a spliced break, skipping", index);
                continue;
            }

            let cue = match self.decoder.decode(payload) {
                Ok(cue) => cue,
                Err(e) => {
                    warn!("Skipping cue on segment {} ({}): {}", index, segment.uri, e);
                    report.cues_rejected += 1;
                    metrics::record_splice_cue("rejected");
                    continue;
                }
            };

            if is_splice_insert(&cue) {
                metrics::record_splice_cue("splice_insert");
                splice_points.push(index);
            } else {
                debug!(
                    "Cue on segment {} is {:?}, not a splice insert",
                    index, cue.splice_command_type
                );
                metrics::record_splice_cue("ignored");
            }
        }

        // Back to front so earlier indices stay valid while inserting
        for &index in splice_points.iter().rev() {
            let ad_break = AdBreak::new(ad_id, ad_duration);
            let added = document.insert_ad_break(index, &ad_break);
            if added > 0 {
                report.breaks_inserted += 1;
                report.segments_added += added;
                metrics::record_ad_break("cue");
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad::test_support::assert_breaks_well_formed;
    use crate::hls::document::CUE_OUT_TAG;
    use crate::scte35::section::test_support::*;

    fn playlist_with_cues(cues: &[Option<String>]) -> String {
        let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXT-X-MEDIA-SEQUENCE:0\n");
        for (i, cue) in cues.iter().enumerate() {
            if let Some(cue) = cue {
                out.push_str(&format!("#EXT-X-SCTE35:CUE=\"{}\"\n", cue));
            }
            out.push_str(&format!("#EXTINF:10.0,\n/media/1080p/segment_{:03}.ts\n", i + 1));
        }
        out
    }

    fn parse(content: &str) -> PlaylistDocument {
        PlaylistDocument::parse(content.as_bytes(), Path::new("test.m3u8")).unwrap()
    }

    #[test]
    fn no_cues_leaves_document_unchanged() {
        let mut doc = parse(&playlist_with_cues(&[None, None, None]));
        let report = AdSplicer::new().splice_document(&mut doc, "adv1", 30.0);
        assert_eq!(report, SpliceReport::default());
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn splice_insert_gets_break_before_cue_segment() {
        let mut doc = parse(&playlist_with_cues(&[
            None,
            Some(splice_insert_base64(1, 30)),
            None,
        ]));
        let report = AdSplicer::new().splice_document(&mut doc, "adv1", 30.0);

        assert_eq!(report.breaks_inserted, 1);
        assert_eq!(report.segments_added, 3);
        let uris: Vec<&str> = doc.segments().map(|s| s.uri).collect();
        assert_eq!(
            uris,
            vec![
                "/media/1080p/segment_001.ts",
                "/ads/adv1/1080p/segment_000.ts",
                "/ads/adv1/1080p/segment_001.ts",
                "/ads/adv1/1080p/segment_002.ts",
                "/media/1080p/segment_002.ts",
                "/media/1080p/segment_003.ts",
            ]
        );
    }

    #[test]
    fn time_signal_is_ignored() {
        let mut doc = parse(&playlist_with_cues(&[Some(time_signal_base64(0)), None]));
        let report = AdSplicer::new().splice_document(&mut doc, "adv1", 30.0);
        assert_eq!(report.cues_seen, 1);
        assert_eq!(report.breaks_inserted, 0);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn malformed_cue_is_skipped_and_scan_continues() {
        let mut doc = parse(&playlist_with_cues(&[
            Some(splice_insert_base64(1, 30)),
            None,
            Some("!!not-base64!!".to_string()),
            None,
            Some(splice_insert_base64(2, 30)),
        ]));
        let report = AdSplicer::new().splice_document(&mut doc, "adv1", 20.0);

        assert_eq!(report.cues_seen, 3);
        assert_eq!(report.cues_rejected, 1);
        assert_eq!(report.breaks_inserted, 2);
        assert_eq!(doc.len(), 5 + 4);

        let cue_outs = doc
            .media_segments()
            .iter()
            .filter(|s| s.unknown_tags.iter().any(|t| t.tag == CUE_OUT_TAG))
            .count();
        assert_eq!(cue_outs, 2);
    }

    #[test]
    fn zero_duration_inserts_nothing() {
        let mut doc = parse(&playlist_with_cues(&[Some(splice_insert_base64(1, 30)), None]));
        let report = AdSplicer::new().splice_document(&mut doc, "adv1", 0.0);
        assert_eq!(report.breaks_inserted, 0);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn second_pass_is_idempotent() {
        let mut doc = parse(&playlist_with_cues(&[None, Some(splice_insert_base64(1, 30))]));
        let splicer = AdSplicer::new();
        splicer.splice_document(&mut doc, "adv1", 30.0);
        let len = doc.len();

        let report = splicer.splice_document(&mut doc, "adv1", 30.0);
        assert_eq!(report.breaks_inserted, 0);
        assert_eq!(doc.len(), len);
    }

    struct RejectAll;

    impl CueDecoder for RejectAll {
        fn decode(&self, _payload: &str) -> Result<crate::scte35::SpliceInfoSection> {
            Err(crate::error::LivehlsError::CueDecode("rejected".to_string()))
        }
    }

    #[test]
    fn custom_decoder_is_used() {
        let mut doc = parse(&playlist_with_cues(&[Some(splice_insert_base64(1, 30)), None]));
        let report = AdSplicer::with_decoder(RejectAll).splice_document(&mut doc, "adv1", 30.0);
        assert_eq!(report.cues_rejected, 1);
        assert_eq!(doc.len(), 2);
    }

    #[tokio::test]
    async fn insert_ads_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.m3u8");
        tokio::fs::write(
            &path,
            playlist_with_cues(&[None, Some(splice_insert_base64(9, 30)), None]),
        )
        .await
        .unwrap();

        let report = AdSplicer::new().insert_ads(&path, "adv1", 30.0).await.unwrap();
        assert_eq!(report.breaks_inserted, 1);

        let reloaded = PlaylistDocument::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 6);
    }

    #[tokio::test]
    async fn saved_text_pairs_markers_after_discontinuities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.m3u8");
        let first = splice_insert_base64(1, 30);
        let second = splice_insert_base64(2, 30);
        tokio::fs::write(
            &path,
            playlist_with_cues(&[Some(first.clone()), None, None, Some(second.clone()), None]),
        )
        .await
        .unwrap();

        let report = AdSplicer::new().insert_ads(&path, "adv1", 25.4).await.unwrap();
        assert_eq!(report.breaks_inserted, 2);

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        assert_breaks_well_formed(&text);
        assert_eq!(text.matches("#EXT-X-CUE-OUT:DURATION=26").count(), 2);
        assert_eq!(text.matches("#EXT-X-CUE-IN").count(), 2);

        // the cue segments keep their own cue tag after the CUE-IN marker
        for cue in [&first, &second] {
            let resumed = format!(
                "#EXT-X-DISCONTINUITY\n#EXT-X-CUE-IN\n#EXT-X-SCTE35:CUE=\"{}\"\n",
                cue
            );
            assert!(text.contains(&resumed), "missing resumed block in:\n{}", text);
        }

        // the break spliced at segment 0 opens the media section
        let first_entry = text
            .lines()
            .skip_while(|l| !l.starts_with("#EXT-X-DISCONTINUITY"))
            .take(2)
            .collect::<Vec<_>>();
        assert_eq!(first_entry, vec!["#EXT-X-DISCONTINUITY", "#EXT-X-CUE-OUT:DURATION=26"]);

        // a second pass keeps the file well formed and unchanged in size
        AdSplicer::new().insert_ads(&path, "adv1", 25.4).await.unwrap();
        let again = tokio::fs::read_to_string(&path).await.unwrap();
        assert_breaks_well_formed(&again);
        assert_eq!(again.matches("#EXT-X-CUE-OUT").count(), 2);
    }

    #[tokio::test]
    async fn insert_ads_surfaces_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = AdSplicer::new()
            .insert_ads(&dir.path().join("missing.m3u8"), "adv1", 30.0)
            .await;
        assert!(result.is_err());
    }
}
