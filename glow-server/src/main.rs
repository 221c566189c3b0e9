//! Glow Server - REST API for certified clinical photo verification
//!
//! Exposes glow-core verification over HTTP:
//! - POST /verify - Compare a photo with its ledger record
//! - POST /watermark - Read the embedded watermark
//! - POST /alignment - Score face landmarks for clinical framing

use std::sync::Arc;

use glow_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("glow_server=info,glow_core=info,tower_http=info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    init_tracing(config.log_json);

    println!("╔════════════════════════════════════════════╗");
    println!("║      GLOW Verification API Server          ║");
    println!("║   Certified Clinical Photography           ║");
    println!("╚════════════════════════════════════════════╝");

    let state = AppState::from_config(&config).map_err(|e| {
        tracing::error!("Ledger initialization failed: {e}");
        e
    })?;
    let notary = Arc::clone(&state.notary);

    let app = create_router_with_config(&config, state)?;

    let addr = config.socket_addr();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    notary.close();
    Ok(())
}
