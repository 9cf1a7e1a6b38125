use crate::error::BusError;
use crate::message::BusMessage;
use crate::traits::BusSubscriptions;
use async_nats::Client;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

struct ActiveSubscription {
	refcount: u32,
	stop: oneshot::Sender<()>,
}

/// Owns the gateway's upstream bus subscriptions, one per distinct subject
/// any client currently cares about, reference-counted so a subject is
/// subscribed exactly once no matter how many clients are interested.
///
/// Mirrors the original gateway's `NatsSubscriptionManager`: `start` only
/// touches the bus on a 0->1 transition and rolls back on failure; `stop`
/// only touches the bus on a 1->0 transition and is silent for subjects it
/// doesn't know about (disconnect races can call `stop` for a subject this
/// manager never started).
pub struct BusSubscriptionManager {
	client: Client,
	inbound: mpsc::Sender<BusMessage>,
	active: Arc<Mutex<HashMap<String, ActiveSubscription>>>,
}

impl BusSubscriptionManager {
	pub fn new(client: Client, inbound: mpsc::Sender<BusMessage>) -> Self {
		Self { client, inbound, active: Arc::new(Mutex::new(HashMap::new())) }
	}

	/// Increments the refcount for `subject`. On the 0->1 transition,
	/// opens an upstream subscription and spawns the task that forwards
	/// every message on it to the fan-out dispatcher. Rolls back on
	/// failure so the caller can report `NATS_SUBSCRIBE_FAILED` without
	/// leaving the refcount inconsistent.
	pub async fn start(&self, subject: &str) -> Result<(), BusError> {
		let mut active = self.active.lock().await;

		if let Some(existing) = active.get_mut(subject) {
			existing.refcount += 1;
			tracing::debug!(subject, refcount = existing.refcount, "bus subscription refcount incremented");
			return Ok(());
		}

		let subscriber = self.client.subscribe(subject.to_string()).await.map_err(|source| BusError::UpstreamSubscribeFailed { subject: subject.to_string(), source: Box::new(source) })?;

		let (stop_tx, stop_rx) = oneshot::channel();
		let inbound = self.inbound.clone();
		let subject_owned = subject.to_string();
		tokio::spawn(Self::run_forwarder(subject_owned, subscriber, inbound, stop_rx));

		active.insert(subject.to_string(), ActiveSubscription { refcount: 1, stop: stop_tx });
		tracing::info!(subject, "upstream bus subscription started");
		Ok(())
	}

	/// Decrements the refcount for `subject`. On the 1->0 transition,
	/// signals the forwarder task to unsubscribe and exit. Unknown
	/// subjects are ignored, matching the original's tolerance for
	/// disconnect-sweep races.
	pub async fn stop(&self, subject: &str) {
		let mut active = self.active.lock().await;

		let Some(existing) = active.get_mut(subject) else {
			tracing::debug!(subject, "stop called for subject with no active upstream subscription");
			return;
		};

		existing.refcount -= 1;
		if existing.refcount > 0 {
			tracing::debug!(subject, refcount = existing.refcount, "bus subscription refcount decremented");
			return;
		}

		let removed = active.remove(subject).expect("just matched above");
		drop(active);

		if removed.stop.send(()).is_err() {
			tracing::warn!(subject, "forwarder task for upstream subscription already gone");
		}
		tracing::info!(subject, "upstream bus subscription stopped");
	}

	/// Unsubscribes every active upstream subscription. Intended for use
	/// during shutdown only.
	pub async fn stop_all(&self) {
		let mut active = self.active.lock().await;
		let drained: Vec<_> = active.drain().collect();
		drop(active);

		for (subject, sub) in drained {
			if sub.stop.send(()).is_err() {
				tracing::warn!(subject, "forwarder task for upstream subscription already gone during shutdown");
			}
		}
	}

	pub fn active_subject_count(&self) -> usize {
		// best-effort, uncontended in practice since this is only used by health/tests
		self.active.try_lock().map(|g| g.len()).unwrap_or(0)
	}
}

#[async_trait]
impl BusSubscriptions for BusSubscriptionManager {
	async fn start(&self, subject: &str) -> Result<(), BusError> {
		BusSubscriptionManager::start(self, subject).await
	}

	async fn stop(&self, subject: &str) {
		BusSubscriptionManager::stop(self, subject).await
	}

	async fn stop_all(&self) {
		BusSubscriptionManager::stop_all(self).await
	}
}

impl BusSubscriptionManager {
	async fn run_forwarder(subject: String, mut subscriber: async_nats::Subscriber, inbound: mpsc::Sender<BusMessage>, mut stop: oneshot::Receiver<()>) {
		loop {
			tokio::select! {
				biased;
				_ = &mut stop => break,
				message = subscriber.next() => {
					match message {
						Some(message) => {
							let forwarded = BusMessage { subject: subject.clone(), payload: message.payload };
							if inbound.send(forwarded).await.is_err() {
								tracing::warn!(subject = subject.as_str(), "fan-out dispatcher channel closed, dropping forwarder");
								break;
							}
						}
						None => {
							tracing::warn!(subject = subject.as_str(), "upstream subscription stream ended unexpectedly");
							break;
						}
					}
				}
			}
		}

		if let Err(err) = subscriber.unsubscribe().await {
			tracing::warn!(subject = subject.as_str(), error = %err, "failed to unsubscribe upstream bus subscription");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tokio::time::timeout;

	fn nats_url() -> String {
		std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string())
	}

	async fn nats_available() -> Option<Client> {
		async_nats::connect(nats_url()).await.ok()
	}

	#[tokio::test]
	async fn start_is_idempotent_on_the_bus_until_refcount_drops_to_zero() {
		let Some(client) = nats_available().await else {
			println!("Skipping test: NATS not available");
			return;
		};
		let (tx, mut rx) = mpsc::channel(16);
		let manager = BusSubscriptionManager::new(client.clone(), tx);

		manager.start("gw.test.shared").await.unwrap();
		manager.start("gw.test.shared").await.unwrap();
		assert_eq!(manager.active_subject_count(), 1);

		client.publish("gw.test.shared", "hello".into()).await.unwrap();
		client.flush().await.unwrap();

		let forwarded = timeout(Duration::from_secs(2), rx.recv()).await.expect("timed out waiting for forwarded message").expect("channel closed");
		assert_eq!(forwarded.subject, "gw.test.shared");

		manager.stop("gw.test.shared").await;
		assert_eq!(manager.active_subject_count(), 1, "first stop should only decrement refcount");

		manager.stop("gw.test.shared").await;
		assert_eq!(manager.active_subject_count(), 0);
	}

	#[tokio::test]
	async fn stop_on_unknown_subject_is_a_silent_noop() {
		let Some(client) = nats_available().await else {
			println!("Skipping test: NATS not available");
			return;
		};
		let (tx, _rx) = mpsc::channel(16);
		let manager = BusSubscriptionManager::new(client, tx);

		manager.stop("gw.test.never-started").await;
		assert_eq!(manager.active_subject_count(), 0);
	}

	#[tokio::test]
	async fn subscribe_failure_surfaces_as_bus_error() {
		// An invalid subject (containing whitespace) is rejected by the
		// client before any network round-trip, exercising the same
		// error path a real upstream rejection would take.
		let Some(client) = nats_available().await else {
			println!("Skipping test: NATS not available");
			return;
		};
		let (tx, _rx) = mpsc::channel(16);
		let manager = BusSubscriptionManager::new(client, tx);

		let result = manager.start("invalid subject with spaces").await;
		assert!(result.is_err());
		assert_eq!(manager.active_subject_count(), 0);
	}
}
