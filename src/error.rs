use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by playlist loading, splicing and manifest persistence.
#[derive(Debug, Error)]
pub enum LivehlsError {
    #[error("Failed to read playlist {path}: {source}")]
    PlaylistRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse playlist: {0}")]
    PlaylistParse(String),

    #[error("Playlist {0} is a master playlist, expected a media playlist")]
    NotMediaPlaylist(PathBuf),

    #[error("Failed to write playlist {path}: {source}")]
    PlaylistWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist manifest {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode SCTE-35 cue: {0}")]
    CueDecode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LivehlsError>;
