mod routes;

use std::sync::Arc;

use chat_relay_lib::{RelayConfig, RelayService, LOG_TARGET};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// Sets up logging and configuration, builds the shared relay service
// and serves the API and the static UI until Ctrl-C.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let cfg = RelayConfig::load();
    let service = Arc::new(RelayService::from_config(&cfg)?);

    if cfg.api_key().is_none() {
        tracing::warn!(
            target: LOG_TARGET,
            "GEMINI_API_KEY is not set; /api/health works but chat requests will fail"
        );
    }

    let app = routes::app(service, &cfg.static_dir);
    let addr = cfg.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        target: LOG_TARGET,
        "listening on {} (model {}, static dir {})",
        addr,
        cfg.model,
        cfg.static_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(target: LOG_TARGET, "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(target: LOG_TARGET, "unable to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
