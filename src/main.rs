use anyhow::Context;
use clap::Parser;

use chapter_extract::config::ProxyConfig;
use chapter_extract::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chapter_extract::init_tracing();
    let config = ProxyConfig::parse();

    let extractor = config.extract.build_extractor()?;
    let app = server::router(extractor);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
