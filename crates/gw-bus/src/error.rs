use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
	/// Boxed rather than the concrete `async_nats::SubscribeError` so
	/// fakes of [`crate::BusSubscriptions`] can construct this variant
	/// without a live bus connection.
	#[error("failed to subscribe upstream to {subject}: {source}")]
	UpstreamSubscribeFailed { subject: String, source: Box<dyn std::error::Error + Send + Sync> },
}
