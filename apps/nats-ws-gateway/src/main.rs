use nats_ws_gateway::{Config, GatewayService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let config = Config::from_env();

	let default_filter = format!(
		"nats_ws_gateway={0},gw_session={0},gw_bus={0},gw_fanout={0},gw_heartbeat={0},gw_registry={0}",
		config.log_level
	);
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!("starting nats-ws-gateway");
	tracing::info!(nats_url = %config.nats_url, bind_addr = %config.bind_addr(), "configuration loaded");

	let service = GatewayService::new(config).await?;
	service.run().await?;

	tracing::info!("nats-ws-gateway shutdown complete");
	Ok(())
}
