//! Live HLS channel server.
//!
//! Publishes a rolling media playlist over a fixed content catalog with
//! pre-roll and cadence mid-roll ad breaks, splices ad breaks into static
//! playlists at SCTE-35 splice-insert cues, and serves the media, ads and
//! manifests directories over HTTP.

pub mod ad;
pub mod config;
pub mod error;
pub mod hls;
pub mod live;
pub mod metrics;
pub mod persist;
pub mod scte35;
pub mod server;
