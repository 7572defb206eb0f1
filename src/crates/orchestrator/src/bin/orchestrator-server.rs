//! careflow orchestrator server.
//!
//! Boot order: tracing, settings, application wiring, flow scan + preload,
//! HTTP serve.

use orchestrator::flows::FlowLoaderConfig;
use orchestrator::{api, AppContext, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env();
    tracing::info!(config_dir = %settings.config_dir.display(), "Starting careflow orchestrator");

    let app = AppContext::from_env(settings.clone());

    let found = app.flows.scan_flows();
    tracing::info!(count = found, "Flow definitions loaded");

    let loader = FlowLoaderConfig::load(&settings.flow_loader_path());
    if !loader.flows.preload.is_empty() {
        app.flows.preload_flows(&loader.flows.preload).await;
    }

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, api::router(app)).await?;
    Ok(())
}
