use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use storymetrics_core::ReportFacade;
use storymetrics_server::state::AppState;
use storymetrics_sources::{LegacyReportClient, NextGenReportClient};

/// `storymetrics health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$STORYMETRICS_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("STORYMETRICS_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storymetrics=info".parse()?),
        )
        .json()
        .init();

    let cfg = storymetrics_server::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Both backend clients live for the whole process and are shared by
    // every report.
    let legacy = LegacyReportClient::new(&cfg.legacy)?;
    let next_gen = NextGenReportClient::from_url(&cfg.reporting_service_url)?;
    if cfg.legacy.access_token.is_none() {
        tracing::warn!(
            "STORYMETRICS_LEGACY_ACCESS_TOKEN not set; legacy reports are sent unauthenticated"
        );
    }

    let facade = ReportFacade::new(Arc::new(legacy), Arc::new(next_gen));
    info!(
        cutover = %facade.classifier().cutover(),
        cutover_instant = %facade.classifier().cutover_instant(cfg.view_timezone),
        view_timezone = %cfg.view_timezone,
        "Report engine ready"
    );

    let state = Arc::new(AppState::new(facade, cfg.view_timezone));
    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = storymetrics_server::app::build_app(state);

    info!(port = cfg.port, "storymetrics listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
