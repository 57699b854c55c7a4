use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use tokio::net::TcpListener;

use pcos_risk::classifier::{self, ModelSource};
use pcos_risk::config::ServerConfig;
use pcos_risk::server::{self, AppState};
use pcos_risk::telemetry::{self, LogTarget};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    telemetry::init(
        "info,pcos_risk=debug,tower_http=info",
        config.log_json,
        LogTarget::Stdout,
    );
    tracing::info!("Starting PCOS risk server with config: {:?}", config);

    let source = ModelSource::from(&config);
    tracing::info!("Loading model from {:?}", source);
    let model = classifier::load(&source).await?;

    let cors = config.cors_policy();
    tracing::info!("CORS policy: {:?}", cors);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = server::router(AppState::new(model), &cors)?
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer);

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());

    axum::serve(listener, app).await?;
    Ok(())
}
