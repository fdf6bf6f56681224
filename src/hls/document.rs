//! In-memory HLS media playlist with file load/save and segment splicing.
//!
//! Segment sequence ids are implicit: the segment at position `i` has id
//! `media_sequence + i`. Inserting segments therefore renumbers everything
//! after the insertion point once the document is saved.

use crate::ad::AdBreak;
use crate::error::{LivehlsError, Result};
use crate::hls::parser::{parse_hls_playlist, serialize_media_playlist};
use crate::persist::write_atomic;
use m3u8_rs::{ExtTag, MediaPlaylist, MediaSegment, Playlist};
use std::path::Path;
use tracing::{debug, info, warn};

/// Custom tag names (without the `#EXT-` prefix) that carry a base64 cue.
pub const CUE_TAG_KEYS: [&str; 4] = ["X-SCTE35", "SCTE35", "X-SCTE", "SCTE"];

pub const CUE_OUT_TAG: &str = "X-CUE-OUT";
pub const CUE_IN_TAG: &str = "X-CUE-IN";

/// Read-only view of one playlist entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a> {
    pub sequence_id: u64,
    pub uri: &'a str,
    pub duration: f64,
    /// Raw base64 splice cue, when the entry carries one
    pub cue: Option<&'a str>,
}

/// Extract the cue payload from a tag value.
///
/// Accepts both a bare payload (`#EXT-X-SCTE35:/DA...`) and an attribute
/// list with a `CUE` attribute (`#EXT-X-SCTE35:CUE="/DA...",ID="1"`).
fn cue_from_tag_value(rest: &str) -> Option<&str> {
    for attribute in rest.split(',') {
        if let Some((key, value)) = attribute.split_once('=')
            && key.trim().eq_ignore_ascii_case("CUE")
        {
            let value = value.trim().trim_matches('"');
            return (!value.is_empty()).then_some(value);
        }
    }

    // A base64 payload may itself end in '=' padding, so only treat the value
    // as an attribute list when it starts with a KEY= prefix.
    let rest = rest.trim();
    let looks_like_attributes = rest
        .split_once('=')
        .is_some_and(|(key, _)| !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c == '-'));
    if rest.is_empty() || looks_like_attributes {
        None
    } else {
        Some(rest.trim_matches('"'))
    }
}

/// Cue payload carried by a segment under one of [`CUE_TAG_KEYS`].
pub fn segment_cue(segment: &MediaSegment) -> Option<&str> {
    segment
        .unknown_tags
        .iter()
        .filter(|t| CUE_TAG_KEYS.contains(&t.tag.as_str()))
        .find_map(|t| t.rest.as_deref().and_then(cue_from_tag_value))
}

fn has_tag(segment: &MediaSegment, name: &str) -> bool {
    segment.unknown_tags.iter().any(|t| t.tag == name)
}

/// `true` when the segment already closes a spliced break.
pub fn closes_ad_break(segment: &MediaSegment) -> bool {
    has_tag(segment, CUE_IN_TAG)
}

#[derive(Debug, Clone)]
pub struct PlaylistDocument {
    playlist: MediaPlaylist,
}

impl PlaylistDocument {
    /// Empty live playlist (no `EXT-X-ENDLIST`).
    pub fn new(target_duration: u64, media_sequence: u64) -> Self {
        Self {
            playlist: MediaPlaylist {
                version: Some(3),
                target_duration,
                media_sequence,
                ..Default::default()
            },
        }
    }

    /// Parse a document from playlist bytes. Master playlists are rejected.
    pub fn parse(content: &[u8], origin: &Path) -> Result<Self> {
        match parse_hls_playlist(content)? {
            Playlist::MediaPlaylist(playlist) => Ok(Self { playlist }),
            Playlist::MasterPlaylist(_) => Err(LivehlsError::NotMediaPlaylist(origin.to_path_buf())),
        }
    }

    /// Load a media playlist from `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| LivehlsError::PlaylistRead {
                path: path.to_path_buf(),
                source,
            })?;

        let document = Self::parse(&content, path)?;
        info!(
            "Loaded playlist {} ({} segments, media sequence {})",
            path.display(),
            document.len(),
            document.media_sequence()
        );
        Ok(document)
    }

    /// Write the document to `path`, replacing any existing file atomically.
    pub async fn save(&mut self, path: &Path) -> Result<()> {
        self.raise_target_duration();
        let bytes = self.to_bytes()?;

        write_atomic(path, &bytes)
            .await
            .map_err(|source| LivehlsError::PlaylistWrite {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            "Saved playlist {} ({} segments)",
            path.display(),
            self.len()
        );
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialize_media_playlist(&self.playlist)
    }

    pub fn media_playlist(&self) -> &MediaPlaylist {
        &self.playlist
    }

    pub fn media_sequence(&self) -> u64 {
        self.playlist.media_sequence
    }

    pub fn target_duration(&self) -> u64 {
        self.playlist.target_duration
    }

    pub fn len(&self) -> usize {
        self.playlist.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playlist.segments.is_empty()
    }

    pub fn media_segments(&self) -> &[MediaSegment] {
        &self.playlist.segments
    }

    /// Iterate entries in sequence order.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        let base = self.playlist.media_sequence;
        self.playlist
            .segments
            .iter()
            .enumerate()
            .map(move |(i, s)| Segment {
                sequence_id: base + i as u64,
                uri: &s.uri,
                duration: s.duration as f64,
                cue: segment_cue(s),
            })
    }

    pub fn append_segments(&mut self, segments: impl IntoIterator<Item = MediaSegment>) {
        self.playlist.segments.extend(segments);
    }

    /// Insert `segments` before position `index` (clamped to the end).
    pub fn insert_segments(&mut self, index: usize, segments: Vec<MediaSegment>) {
        let index = index.min(self.playlist.segments.len());
        let count = segments.len();
        self.playlist.segments.splice(index..index, segments);
        debug!("Inserted {} segments at index {}", count, index);
    }

    /// Splice an ad break in before the segment at `index`.
    ///
    /// The first ad entry opens the break (discontinuity + cue-out) and the
    /// segment that was at `index` closes it (discontinuity + cue-in).
    /// Returns the number of entries added; nothing is inserted for an empty
    /// break or when there is no segment at `index` to close the break.
    pub fn insert_ad_break(&mut self, index: usize, ad_break: &AdBreak) -> usize {
        if ad_break.is_empty() {
            return 0;
        }
        if index >= self.playlist.segments.len() {
            warn!(
                "No segment at index {} to close ad break for {}, skipping",
                index, ad_break.ad_id
            );
            return 0;
        }

        let mut entries: Vec<MediaSegment> = ad_break
            .segments
            .iter()
            .map(|ad| MediaSegment {
                uri: ad.uri.clone(),
                duration: ad.duration as f32,
                ..Default::default()
            })
            .collect();

        if let Some(first) = entries.first_mut() {
            first.discontinuity = true;
            first.unknown_tags.push(ExtTag {
                tag: CUE_OUT_TAG.to_string(),
                rest: Some(ad_break.cue_out_attributes()),
            });
        }

        let resumed = &mut self.playlist.segments[index];
        resumed.discontinuity = true;
        resumed.unknown_tags.insert(
            0,
            ExtTag {
                tag: CUE_IN_TAG.to_string(),
                rest: None,
            },
        );

        let added = entries.len();
        self.insert_segments(index, entries);
        added
    }

    /// Evict the oldest entries so at most `window_size` remain.
    ///
    /// The media sequence advances by the number evicted, keeping
    /// `media_sequence + len` unchanged. Returns the number evicted.
    pub fn slide_window(&mut self, window_size: usize) -> usize {
        let len = self.playlist.segments.len();
        if len <= window_size {
            return 0;
        }
        let evicted = len - window_size;
        self.playlist.segments.drain(..evicted);
        self.playlist.media_sequence += evicted as u64;
        evicted
    }

    /// Make sure `EXT-X-TARGETDURATION` covers the longest entry.
    fn raise_target_duration(&mut self) {
        let longest = self
            .playlist
            .segments
            .iter()
            .map(|s| s.duration)
            .fold(0.0f32, f32::max);
        let needed = longest.ceil() as u64;
        if needed > self.playlist.target_duration {
            debug!(
                "Raising target duration from {} to {}",
                self.playlist.target_duration, needed
            );
            self.playlist.target_duration = needed;
        }
    }
}
