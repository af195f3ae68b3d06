//! mjpeg-relay: multi-camera MJPEG proxy
//!
//! Reads a JSON camera list and serves each camera on its own port.
//!
//! ## Usage
//!
//! ```bash
//! # cameras from ./config.json
//! mjpeg-relay
//!
//! # custom config, loopback only, JSON logs
//! RUST_LOG=mjpeg_relay=debug mjpeg-relay --config /etc/cameras.json --bind 127.0.0.1 --log-format json
//! ```
//!
//! ## Config
//!
//! ```json
//! [
//!   { "name": "door", "url": "http://10.0.0.5:81/stream", "port": 8081, "aliases": ["cam1", "front"] }
//! ]
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mjpeg_relay::{load_cameras, RelayConfig, RelayGroup};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "mjpeg-relay", version, about = "Relay MJPEG camera streams to many viewers")]
struct Args {
    /// JSON camera list
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Address viewer ports bind to
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
    }
}

#[tokio::main]
async fn main() -> mjpeg_relay::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format);

    let cameras = match load_cameras(&args.config) {
        Ok(cameras) => cameras,
        Err(e) => {
            tracing::error!(config = %args.config.display(), error = %e, "Cannot load cameras");
            return Err(e.into());
        }
    };

    let config = RelayConfig::default().bind(args.bind);
    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();

    let groups = match RelayGroup::bind_all(cameras, &config).await {
        Ok(groups) => groups,
        Err(e) => {
            tracing::error!(error = %e, "No relay could be started");
            return Err(e);
        }
    };

    for group in groups {
        let shutdown = shutdown.clone();
        tracker.spawn(async move { group.run(shutdown).await });
    }
    tracker.close();

    tracing::info!(cameras = tracker.len(), "Multi-camera relay running");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
        _ = tracker.wait() => {}
    }

    shutdown.cancel();
    tracker.wait().await;
    Ok(())
}
