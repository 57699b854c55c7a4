use clap::Parser;
use tokio::io::{BufReader, stdin, stdout};

use pcos_risk::config::RelayConfig;
use pcos_risk::generator::GeminiClient;
use pcos_risk::relay;
use pcos_risk::telemetry::{self, LogTarget};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::parse();
    telemetry::init("warn", config.log_json, LogTarget::Stderr);
    tracing::debug!(model = %config.model, base_url = %config.base_url, "Starting chat relay");

    let client = GeminiClient::new(config.base_url, config.api_key, config.model);
    relay::run(&client, BufReader::new(stdin()), stdout()).await
}
