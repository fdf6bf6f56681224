use crate::error::{LivehlsError, Result};
use m3u8_rs::{MediaPlaylist, Playlist, parse_playlist_res};
use tracing::debug;

/// Parse HLS playlist from raw bytes
pub fn parse_hls_playlist(content: &[u8]) -> Result<Playlist> {
    debug!("Parsing HLS playlist ({} bytes)", content.len());

    match parse_playlist_res(content) {
        Ok(playlist) => {
            debug!("Successfully parsed playlist");
            Ok(playlist)
        }
        Err(e) => {
            let error_msg = format!("Failed to parse playlist: {:?}", e);
            Err(LivehlsError::PlaylistParse(error_msg))
        }
    }
}

/// Serialize a media playlist back to bytes
pub fn serialize_media_playlist(playlist: &MediaPlaylist) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    playlist
        .write_to(&mut output)
        .map_err(|e| LivehlsError::PlaylistParse(format!("Failed to write playlist: {}", e)))?;
    Ok(output)
}
