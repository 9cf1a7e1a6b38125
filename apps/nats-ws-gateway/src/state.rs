use gw_bus::BusSubscriptionManager;
use gw_heartbeat::HeartbeatController;
use gw_registry::SubscriptionRegistry;
use std::sync::Arc;

/// Shared state handed to every connection's [`gw_session::SessionHandler`].
#[derive(Clone)]
pub struct AppState {
	pub registry: Arc<SubscriptionRegistry>,
	pub bus: Arc<BusSubscriptionManager>,
	pub heartbeat: Arc<HeartbeatController<async_nats::Client>>,
	pub heartbeat_event_name: Arc<str>,
}
