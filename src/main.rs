use clap::{Parser, Subcommand};
use livehls::{
    config::Config,
    hls::AdSplicer,
    live::{ChannelSettings, LiveChannel, LiveManifestState, Scheduler},
    metrics, server,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "livehls")]
#[command(author, version, about = "Rolling live HLS channel with ad insertion")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the live manifest and serve media, ads and manifests (default)
    Serve,

    /// Splice ad breaks into a media playlist at its SCTE-35 splice inserts
    Splice {
        /// Media playlist to rewrite in place
        #[arg(required = true)]
        playlist: PathBuf,

        /// Ad identifier used in ad segment URIs
        #[arg(long, default_value = "adv1")]
        ad_id: String,

        /// Seconds of ads per break
        #[arg(long, default_value = "30")]
        duration: f64,
    },
}

#[tokio::main]
async fn main() {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Splice {
            playlist,
            ad_id,
            duration,
        } => splice(playlist, ad_id, duration).await,
    }
}

async fn serve() {
    info!("Starting livehls {}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    info!("Running in {} mode", if config.is_dev { "DEV" } else { "PROD" });

    metrics::init();

    let channel = Arc::new(LiveChannel::new(
        LiveManifestState::new(ChannelSettings::from(&config)),
        config.manifest_path(),
    ));

    let shutdown = CancellationToken::new();
    let scheduler =
        Scheduler::new(channel.clone(), config.update_interval()).spawn(shutdown.clone());

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        signal.cancel();
    });

    let result = server::start(config, channel, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        error!("Scheduler task failed: {}", e);
    }

    if let Err(e) = result {
        error!("Failed to start server: {}", e);
        std::process::exit(1);
    }
}

async fn splice(playlist: PathBuf, ad_id: String, duration: f64) {
    if ad_id.trim().is_empty() || !duration.is_finite() || duration < 0.0 {
        error!("Invalid ad id {:?} or duration {}", ad_id, duration);
        std::process::exit(1);
    }

    match AdSplicer::new().insert_ads(&playlist, &ad_id, duration).await {
        Ok(report) => info!(
            "Splice complete: {} breaks, {} segments added, {} cues seen, {} rejected",
            report.breaks_inserted,
            report.segments_added,
            report.cues_seen,
            report.cues_rejected
        ),
        Err(e) => {
            error!("Failed to splice {}: {}", playlist.display(), e);
            std::process::exit(1);
        }
    }
}
