use std::sync::Arc;

use scylla_gateway::batch::{BatchProcessor, BusTarget};
use scylla_gateway::bus::EventBus;
use scylla_gateway::config::GatewayConfig;
use scylla_gateway::stdio::{self, Routes};
use scylla_gateway::{Gateway, server, session, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let config = GatewayConfig::load()?;
    let meta = server::server_info();
    info!(name = meta.name, version = meta.version, address = %config.address, "starting");

    let backend = Arc::new(session::connect(&config).await?);
    let gateway = Arc::new(Gateway::from_config(backend, &config));

    let bus = EventBus::new();
    bus.register(config.address.clone(), gateway).await;
    let target = Arc::new(BusTarget::new(bus.clone(), config.address.clone()));
    bus.register(
        config.batch_address(),
        Arc::new(BatchProcessor::new(target, config.batch_timeout())),
    )
    .await;

    stdio::run_stdio_server(bus, Routes::from_config(&config)).await
}
