//! Router and listener.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use debridgate_common::Result;

use crate::config::GatewayConfig;
use crate::proxy;
use crate::state::AppState;

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v0/proxy/{token}", get(proxy::redeem))
        .route("/v0/proxy/{token}/{filename}", get(proxy::redeem_named))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let stores: Vec<_> = state.registry.stores().iter().map(|s| s.as_str()).collect();
    Json(json!({ "status": "ok", "stores": stores }))
}

/// Serve the gateway until Ctrl-C.
pub async fn serve(config: &GatewayConfig) -> Result<()> {
    let state = AppState::new(config)?;
    let listener = TcpListener::bind(&config.listen).await?;
    info!(
        listen = %config.listen,
        base_url = %config.base_url,
        "gateway listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    // A failed handler install means no graceful shutdown, not a crash.
    let _ = tokio::signal::ctrl_c().await;
}
