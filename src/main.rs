use anyhow::Context;
use axum::ServiceExt;
use axum::extract::Request;
use kindred::api::{self, app_state::AppState};
use kindred::config::loader::ConfigLoader;
use kindred::observability::init_tracing;
use kindred::storage::StorageFactory;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config).context("invalid configuration")?;

    // 文件日志的 guard 必须活到进程退出
    let _guard = init_tracing(&config.logging, &config.app_name);
    info!(
        "Starting {} ({} environment)...",
        config.app_name, config.environment
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::from_config(config).context("failed to build application state")?;
    info!("Application state created: {:?}", app_state);

    match StorageFactory::health_check(&app_state.storage).await {
        Ok(_) => info!("Record store reachable"),
        Err(e) => warn!("Record store not reachable yet: {}", e),
    }

    let router = api::initialize_api(app_state).await?;
    let app = NormalizePathLayer::trim_trailing_slash().layer(router);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
