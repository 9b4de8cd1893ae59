use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use oratio::app::App;
use oratio::config::OratioConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OratioConfig::from_env().context("invalid configuration")?;

    // ORATIO_LOG_LEVEL wins over RUST_LOG.
    let filter = match &config.server.log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid ORATIO_LOG_LEVEL {level:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Oratio");
    tracing::debug!(
        config = %serde_json::to_string(&config).unwrap_or_default(),
        "Configuration loaded"
    );

    let app = App::open(&config).await.with_context(|| {
        format!(
            "failed to open the ability store at {}",
            config.abilities.db_path.display()
        )
    })?;

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(port = config.server.port, "Listening");

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    app.sweep.abort();
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
