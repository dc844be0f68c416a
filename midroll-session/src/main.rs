//! Midroll session daemon - main entry point
//!
//! Mounts a playback session over the simulated engines and serves the
//! HTTP/SSE control surface until a signal arrives or the session is
//! closed from user input.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midroll_common::events::CloseReason;
use midroll_common::EventLog;
use midroll_session::api;
use midroll_session::config::{Config, ConfigOverrides};
use midroll_session::engine::sim::{SimAdEngine, SimContentEngine, SimSurface};
use midroll_session::engine::{AdEngine, ContentEngine, VideoSurface};
use midroll_session::session::controller::{SessionController, SessionOptions};

/// Command-line arguments for midroll-session
#[derive(Parser, Debug)]
#[command(name = "midroll-session")]
#[command(about = "Playback and ad insertion session daemon")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MIDROLL_PORT")]
    port: Option<u16>,

    /// Content URI to load when the session mounts
    #[arg(short, long, env = "MIDROLL_CONTENT_URI")]
    content_uri: Option<String>,

    /// VAST ad tag URL
    #[arg(long, env = "MIDROLL_AD_TAG_URL")]
    ad_tag_url: Option<String>,

    /// Path to TOML configuration file
    #[arg(long, env = "MIDROLL_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "midroll_session=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let overrides = ConfigOverrides {
        port: args.port,
        content_uri: args.content_uri,
        ad_tag_url: args.ad_tag_url,
    };
    let config = Config::load(args.config.as_deref(), overrides)
        .await
        .context("Failed to load configuration")?;

    info!("Starting midroll session daemon on port {}", config.port);
    info!("Content URI: {}", config.content_uri);

    // Simulated engines; a real deployment binds platform engines here
    let content_engine: Arc<dyn ContentEngine> = Arc::new(SimContentEngine::new(&config.sim));
    let surface: Arc<dyn VideoSurface> = Arc::new(SimSurface::default());
    let ad_engine: Option<Arc<dyn AdEngine>> = Some(Arc::new(SimAdEngine::new(&config.sim)));

    let log = Arc::new(EventLog::new(256));

    let controller = SessionController::mount(
        content_engine,
        ad_engine,
        surface,
        log.clone(),
        SessionOptions {
            content_uri: config.content_uri.clone(),
            ad_tag_url: config.ads.tag_url.clone(),
            min_ad_interval: config.ads.min_interval(),
            progress_interval: config.progress_interval(),
        },
    )
    .await
    .context("Failed to mount playback session")?;
    info!("Session {} mounted", controller.session_id());

    // Build the application router
    let app_state = api::AppState {
        controller: controller.clone(),
        log,
        port: config.port,
    };
    let app = api::create_router(app_state);

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(controller.clone()))
        .await
        .context("Server error")?;

    controller.close(CloseReason::Shutdown).await;
    controller.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C, SIGTERM, or session close from user input
async fn shutdown_signal(controller: Arc<SessionController>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let mut closed = controller.closed();
    let session_closed = async move {
        while closed.changed().await.is_ok() {
            if closed.borrow().is_some() {
                break;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
        _ = session_closed => {
            info!("Session closed by user input, shutting down");
        },
    }
}
