use crate::config::Config;
use crate::error::{Error, Result};
use crate::state::AppState;
use gw_bus::BusSubscriptionManager;
use gw_fanout::FanoutDispatcher;
use gw_heartbeat::HeartbeatController;
use gw_registry::SubscriptionRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Bring-up, request serving, and graceful shutdown for the gateway
/// process: connect to the bus, wire the registry/manager/heartbeat
/// controller/fan-out dispatcher together, bind the WebSocket listener,
/// and serve until a shutdown signal is observed.
pub struct GatewayService {
	config: Config,
	state: AppState,
	fanout_task: JoinHandle<()>,
}

impl GatewayService {
	pub async fn new(config: Config) -> Result<Self> {
		tracing::info!(nats_url = %config.nats_url, client_name = %config.nats_client_name, "connecting to bus");
		let bus_client = async_nats::ConnectOptions::new()
			.name(config.nats_client_name.clone())
			.connect(&config.nats_url)
			.await
			.map_err(|source| Error::BusConnect { url: config.nats_url.clone(), source })?;
		tracing::info!("bus connection established");

		let (inbound_tx, inbound_rx) = mpsc::channel(1024);
		let registry = Arc::new(SubscriptionRegistry::new());
		let bus = Arc::new(BusSubscriptionManager::new(bus_client.clone(), inbound_tx));
		let heartbeat = Arc::new(HeartbeatController::new(Arc::new(bus_client)));
		let heartbeat_event_name: Arc<str> = Arc::from(config.heartbeat_event_name.as_str());

		let fanout_task = tokio::spawn(FanoutDispatcher::new(registry.clone()).run(inbound_rx));

		let state = AppState { registry, bus, heartbeat, heartbeat_event_name };

		Ok(Self { config, state, fanout_task })
	}

	pub async fn run(self) -> Result<()> {
		let addr = self.config.bind_addr();
		let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|source| Error::Bind { addr: addr.clone(), source })?;
		tracing::info!(addr = %addr, "listening for WebSocket connections");

		let app = axum::Router::new().route("/ws", axum::routing::get(crate::ws::websocket_handler)).with_state(self.state.clone());

		axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
			.with_graceful_shutdown(shutdown_signal())
			.await?;

		tracing::info!("no longer accepting connections, tearing down upstream bus subscriptions");
		self.state.bus.stop_all().await;

		if tokio::time::timeout(Duration::from_secs(5), self.fanout_task).await.is_err() {
			tracing::warn!("fan-out dispatcher did not exit within the shutdown grace period");
		}

		tracing::info!("graceful shutdown complete");
		Ok(())
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		tokio::signal::ctrl_c().await.expect("failed to install ctrl_c handler");
	};

	#[cfg(unix)]
	let terminate = async {
		tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler").recv().await;
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	tracing::info!("shutdown signal received");
}
