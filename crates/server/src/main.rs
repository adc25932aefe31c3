mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coldpress_core::{
    load_config, validate_config, Config, EventSink, FfmpegTranscoder, JobRunner, Transcoder,
};

use api::{create_router, WsBroadcaster};
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path; explicit env path must exist, the default is
    // optional (the service runs fine on defaults alone).
    let config = match std::env::var("COLDPRESS_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {:?}", path);
            load_config(&path)
                .with_context(|| format!("Failed to load config from {:?}", path))?
        }
        Err(_) => {
            let default_path = PathBuf::from("config.toml");
            if default_path.exists() {
                info!("Loading configuration from {:?}", default_path);
                load_config(&default_path)
                    .with_context(|| format!("Failed to load config from {:?}", default_path))?
            } else {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    };

    validate_config(&config).context("Configuration validation failed")?;

    // The transcoding tools are a hard requirement; refuse to start without
    // them rather than failing every job later.
    let transcoder: Arc<dyn Transcoder> =
        Arc::new(FfmpegTranscoder::new(config.transcoder.clone()));
    transcoder.validate().await.context(
        "ffmpeg/ffprobe not available. Install ffmpeg and ensure it is in your PATH \
         (Linux: apt install ffmpeg, macOS: brew install ffmpeg)",
    )?;
    info!("ffmpeg and ffprobe found");

    // WebSocket broadcaster doubles as the job runner's event sink
    let ws_broadcaster = WsBroadcaster::default();
    let sink: Arc<dyn EventSink> = Arc::new(ws_broadcaster.clone());

    let runner = JobRunner::new(
        Arc::clone(&transcoder),
        sink,
        config.transcoder.fallback_duration_secs,
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        transcoder,
        runner,
        ws_broadcaster,
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
