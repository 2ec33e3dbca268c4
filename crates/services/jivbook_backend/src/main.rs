use std::sync::Arc;

use jivbook_backend::app_state::AppState;
use jivbook_backend::build_router;
use jivbook_common::logging;
use jivbook_config::load_config;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = Arc::new(load_config().expect("Failed to load config"));
    let _log_guard = logging::init_from_config(&config.logging);

    let state = AppState::new(config.clone())
        .await
        .expect("Failed to initialize services");
    if let Some(scheduler) = state.scheduler() {
        scheduler.start_all();
    }

    let app = build_router(&state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", addr, e));
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    if let Err(err) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }

    if let Some(scheduler) = state.scheduler() {
        scheduler.stop_all();
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
