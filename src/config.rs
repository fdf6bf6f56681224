use crate::error::LivehlsError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub is_dev: bool,
    /// Root served under `/media/`
    pub media_dir: PathBuf,
    /// Root served under `/ads/`
    pub ads_dir: PathBuf,
    /// Root served under `/manifests/`; the live manifest is written here
    pub manifests_dir: PathBuf,
    /// File name of the live manifest inside `manifests_dir`
    pub manifest_name: String,
    /// Content entries per rendered window
    pub window_size: u64,
    /// Number of content segments in the catalog
    pub total_segments: u64,
    /// EXTINF duration of content segments in seconds
    pub segment_duration: f64,
    /// Seconds between manifest updates
    pub update_interval_secs: u64,
    pub ad_id: String,
    /// Seconds per ad break
    pub ad_duration: u32,
    /// Mid-roll after every N-th catalog entry, 0 disables
    pub ad_cadence: u64,
}

/// Read `key` and parse it, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("{} has invalid value {:?}: {}", key, raw, e).into()),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, PORT defaults to 8080. In PROD mode it is required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let port = if is_dev {
            env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?
        } else {
            env::var("PORT")
                .map_err(|_| "PORT is required in production")?
                .parse()?
        };

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let media_dir = PathBuf::from(env::var("MEDIA_DIR").unwrap_or_else(|_| "media".to_string()));
        let ads_dir = PathBuf::from(env::var("ADS_DIR").unwrap_or_else(|_| "ads".to_string()));
        let manifests_dir =
            PathBuf::from(env::var("MANIFESTS_DIR").unwrap_or_else(|_| "manifests".to_string()));
        let manifest_name = env::var("MANIFEST_NAME").unwrap_or_else(|_| "live.m3u8".to_string());

        let config = Config {
            host,
            port,
            is_dev,
            media_dir,
            ads_dir,
            manifests_dir,
            manifest_name,
            window_size: parse_or("WINDOW_SIZE", 10)?,
            total_segments: parse_or("TOTAL_SEGMENTS", 59)?,
            segment_duration: parse_or("SEGMENT_DURATION", 10.0)?,
            update_interval_secs: parse_or("UPDATE_INTERVAL_SECS", 10)?,
            ad_id: env::var("AD_ID").unwrap_or_else(|_| "adv1".to_string()),
            ad_duration: parse_or("AD_DURATION", 30)?,
            ad_cadence: parse_or("AD_CADENCE", 10)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), LivehlsError> {
        if self.port == 0 {
            return Err(LivehlsError::Config("invalid port number: 0".to_string()));
        }
        if self.window_size == 0 {
            return Err(LivehlsError::Config("window size must be positive".to_string()));
        }
        if self.total_segments == 0 {
            return Err(LivehlsError::Config(
                "total segments must be positive".to_string(),
            ));
        }
        if !self.segment_duration.is_finite() || self.segment_duration <= 0.0 {
            return Err(LivehlsError::Config(format!(
                "invalid segment duration: {}",
                self.segment_duration
            )));
        }
        if self.update_interval_secs == 0 {
            return Err(LivehlsError::Config(
                "update interval must be positive".to_string(),
            ));
        }
        if self.ad_id.trim().is_empty() || self.ad_id.contains('/') {
            return Err(LivehlsError::Config(format!("invalid ad id: {:?}", self.ad_id)));
        }
        if self.manifest_name.is_empty() || self.manifest_name.contains('/') {
            return Err(LivehlsError::Config(format!(
                "invalid manifest name: {:?}",
                self.manifest_name
            )));
        }
        Ok(())
    }

    /// Full path of the live manifest written by the scheduler.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifests_dir.join(&self.manifest_name)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
