use crate::envelope::build_envelope;
use gw_bus::BusMessage;
use gw_registry::SubscriptionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-client send timeout. A slow or dead client never delays delivery to
/// any other subscriber of the same message.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Fans a single bus message out to every client currently subscribed to
/// its subject, in parallel, isolating each client's failure from the rest.
///
/// Deliberately does not prune dead clients from the registry: the
/// connection's own read loop is the sole writer of registry membership,
/// which keeps that bookkeeping race-free.
pub struct FanoutDispatcher {
	registry: Arc<SubscriptionRegistry>,
}

impl FanoutDispatcher {
	pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
		Self { registry }
	}

	/// Drains `inbound` until the channel closes (normally only at
	/// shutdown, once every bus subscription has been torn down).
	pub async fn run(self, mut inbound: mpsc::Receiver<BusMessage>) {
		while let Some(message) = inbound.recv().await {
			self.dispatch(message).await;
		}
		tracing::info!("fan-out dispatcher exiting: inbound channel closed");
	}

	/// Delivers a single message to every client currently subscribed to its
	/// subject. Exposed (rather than kept private behind `run`) so tests can
	/// dispatch one message at a time without wiring up the inbound channel.
	pub async fn dispatch(&self, message: BusMessage) {
		let subscribers = self.registry.snapshot_subscribers(&message.subject);
		if subscribers.is_empty() {
			tracing::debug!(subject = message.subject.as_str(), "no subscribers for inbound message, dropping");
			return;
		}

		let envelope = build_envelope(&message.subject, &message.payload);

		let sends = subscribers.iter().map(|client| {
			let client = client.clone();
			let frame = envelope.clone();
			async move {
				match tokio::time::timeout(SEND_TIMEOUT, client.enqueue(frame)).await {
					Ok(Ok(())) => true,
					Ok(Err(_)) => {
						tracing::debug!(client = %client.label(), "send failed: client channel closed");
						false
					}
					Err(_) => {
						tracing::warn!(client = %client.label(), timeout_ms = SEND_TIMEOUT.as_millis() as u64, "send timed out");
						false
					}
				}
			}
		});

		let results = futures_util::future::join_all(sends).await;
		let delivered = results.iter().filter(|ok| **ok).count();
		let total = results.len();

		if delivered < total {
			tracing::warn!(subject = message.subject.as_str(), delivered, total, "partial delivery for fan-out message");
		} else {
			tracing::debug!(subject = message.subject.as_str(), delivered, total, "fan-out message delivered");
		}
	}
}
