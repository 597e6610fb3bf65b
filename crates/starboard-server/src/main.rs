mod http_store;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use starboard_db::Database;
use starboard_engine::maintenance::run_maintenance_loop;
use starboard_engine::{EngineConfig, EventReactor};

use crate::http_store::HttpMessageStore;
use crate::routes::AppState;

/// How long in-flight events get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "starboard=debug,starboard_engine=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = EngineConfig::from_env()?;
    let db_path: PathBuf = std::env::var("STARBOARD_DB_PATH")
        .unwrap_or_else(|_| "starboard.db".into())
        .into();
    let host = std::env::var("STARBOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("STARBOARD_PORT")
        .unwrap_or_else(|_| "3300".into())
        .parse()?;
    let platform_url = std::env::var("STARBOARD_PLATFORM_URL")
        .map_err(|_| anyhow::anyhow!("STARBOARD_PLATFORM_URL must be set"))?;
    let platform_token = std::env::var("STARBOARD_PLATFORM_TOKEN").unwrap_or_default();
    if platform_token.is_empty() {
        warn!("STARBOARD_PLATFORM_TOKEN is empty; platform calls will be unauthenticated");
    }

    info!(
        "Threshold {} (x{} per promotion, x{} every {}s), retention {}h, promotion window {}h",
        config.min_threshold,
        config.growth_factor,
        config.decay_factor,
        config.maintenance_interval.as_secs(),
        config.retention.num_hours(),
        config.promotion_window.num_hours()
    );

    // Init engine
    let db = Arc::new(Database::open(&db_path)?);
    let store = Arc::new(HttpMessageStore::new(&platform_url, platform_token)?);
    let reactor = Arc::new(EventReactor::new(config, db, store)?);

    // Background maintenance
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance = tokio::spawn(run_maintenance_loop(reactor.clone(), shutdown_rx));

    let state = AppState {
        reactor,
        tasks: TaskTracker::new(),
    };
    let tasks = state.tasks.clone();

    let app = Router::new()
        .route("/events", post(routes::ingest_event))
        .route(
            "/communities/{community_id}/board",
            get(routes::get_board)
                .post(routes::enable_board)
                .put(routes::reconfigure_board)
                .delete(routes::disable_board),
        )
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starboard listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight publishes finish, then stop maintenance between batches
    tasks.close();
    if tokio::time::timeout(DRAIN_TIMEOUT, tasks.wait()).await.is_err() {
        warn!("{} event task(s) still running at shutdown", tasks.len());
    }
    let _ = shutdown_tx.send(true);
    maintenance.await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
