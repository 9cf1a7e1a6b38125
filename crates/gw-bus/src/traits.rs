use crate::error::BusError;
use async_trait::async_trait;

/// Narrow interface the WebSocket session handler needs from the bus
/// subscription manager, kept separate from the concrete
/// [`crate::manager::BusSubscriptionManager`] so session logic can be unit
/// tested against an in-memory fake instead of a live bus connection.
#[async_trait]
pub trait BusSubscriptions: Send + Sync {
	async fn start(&self, subject: &str) -> Result<(), BusError>;
	async fn stop(&self, subject: &str);
	async fn stop_all(&self);
}
