use crate::publisher::{publish_heartbeat_action, ControlPublisher, DeviceId, HeartbeatAction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Returns the device id a `subscribe` frame is arming a heartbeat for, if
/// the frame is heartbeat-flavored: it must carry a non-empty device id and
/// an `event` field matching the configured heartbeat event name.
pub fn heartbeat_flavor(event: Option<&str>, device_uuid: Option<&str>, configured_event_name: &str) -> Option<DeviceId> {
	let event = event?.trim();
	let uuid = device_uuid?.trim();
	if event != configured_event_name || uuid.is_empty() {
		return None;
	}
	Some(DeviceId::new(uuid))
}

/// Tracks which device a heartbeat-flavored subject is currently bound to,
/// and emits the START/RELOAD/STOP control publishes that binding implies.
///
/// Lives outside the subscription registry: it only reacts to the
/// added/emptied outcomes the registry and bus manager already computed, it
/// never inspects subject membership itself.
pub struct HeartbeatController<P: ControlPublisher> {
	publisher: Arc<P>,
	bindings: Mutex<HashMap<String, DeviceId>>,
}

impl<P: ControlPublisher> HeartbeatController<P> {
	pub fn new(publisher: Arc<P>) -> Self {
		Self { publisher, bindings: Mutex::new(HashMap::new()) }
	}

	/// Call after a `subscribe` has been accepted into the registry
	/// (`added == true`) and the upstream bus subscription is active,
	/// for a frame that `heartbeat_flavor` identified as heartbeat
	/// traffic for `device_id`.
	pub async fn on_subscribe(&self, subject: &str, device_id: DeviceId) {
		let action = {
			let mut bindings = self.bindings.lock().expect("heartbeat mutex poisoned");
			match bindings.get(subject) {
				None => {
					bindings.insert(subject.to_string(), device_id.clone());
					HeartbeatAction::Start
				}
				Some(bound) if *bound == device_id => HeartbeatAction::Reload,
				Some(bound) => {
					tracing::warn!(subject, previous_device = %bound, new_device = %device_id, "heartbeat subject rebound to a different device; previous device is not stopped");
					bindings.insert(subject.to_string(), device_id.clone());
					HeartbeatAction::Start
				}
			}
		};

		publish_heartbeat_action(self.publisher.as_ref(), &device_id, action).await;
	}

	/// Call whenever a subject transitions to zero subscribers (single
	/// unsubscribe, bulk unsubscribe, or disconnect sweep). Emits
	/// `STOP_HEARTBEAT` only if a binding actually existed.
	pub async fn on_subject_emptied(&self, subject: &str) {
		let bound = { self.bindings.lock().expect("heartbeat mutex poisoned").remove(subject) };

		if let Some(device_id) = bound {
			publish_heartbeat_action(self.publisher.as_ref(), &device_id, HeartbeatAction::Stop).await;
		}
	}

	pub fn bound_device(&self, subject: &str) -> Option<DeviceId> {
		self.bindings.lock().expect("heartbeat mutex poisoned").get(subject).cloned()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::PublishError;
	use async_trait::async_trait;
	use tokio::sync::Mutex as AsyncMutex;

	#[derive(Default)]
	struct RecordingPublisher {
		calls: AsyncMutex<Vec<(String, Vec<u8>)>>,
	}

	#[async_trait]
	impl ControlPublisher for RecordingPublisher {
		async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<(), PublishError> {
			self.calls.lock().await.push((subject, payload));
			Ok(())
		}
	}

	impl RecordingPublisher {
		async fn actions(&self) -> Vec<String> {
			self.calls
				.lock()
				.await
				.iter()
				.map(|(_, payload)| {
					let value: serde_json::Value = serde_json::from_slice(payload).unwrap();
					value["action"].as_str().unwrap().to_string()
				})
				.collect()
		}
	}

	#[test]
	fn heartbeat_flavor_requires_matching_event_and_nonempty_uuid() {
		assert!(heartbeat_flavor(Some("microcontroller_heartbeat"), Some("dev-1"), "microcontroller_heartbeat").is_some());
		assert!(heartbeat_flavor(Some("other_event"), Some("dev-1"), "microcontroller_heartbeat").is_none());
		assert!(heartbeat_flavor(Some("microcontroller_heartbeat"), Some("  "), "microcontroller_heartbeat").is_none());
		assert!(heartbeat_flavor(None, Some("dev-1"), "microcontroller_heartbeat").is_none());
		assert!(heartbeat_flavor(Some("microcontroller_heartbeat"), None, "microcontroller_heartbeat").is_none());
	}

	#[tokio::test]
	async fn first_subscribe_starts_and_repeat_device_reloads() {
		let publisher = Arc::new(RecordingPublisher::default());
		let controller = HeartbeatController::new(publisher.clone());

		controller.on_subscribe("d.1.heartbeat", DeviceId::new("dev-1")).await;
		controller.on_subscribe("d.1.heartbeat", DeviceId::new("dev-1")).await;

		assert_eq!(publisher.actions().await, vec!["START_HEARTBEAT", "RELOAD_HEARTBEAT"]);
	}

	#[tokio::test]
	async fn emptied_subject_stops_only_if_bound() {
		let publisher = Arc::new(RecordingPublisher::default());
		let controller = HeartbeatController::new(publisher.clone());

		controller.on_subject_emptied("never-bound").await;
		assert!(publisher.actions().await.is_empty());

		controller.on_subscribe("d.1.heartbeat", DeviceId::new("dev-1")).await;
		controller.on_subject_emptied("d.1.heartbeat").await;

		assert_eq!(publisher.actions().await, vec!["START_HEARTBEAT", "STOP_HEARTBEAT"]);
		assert!(controller.bound_device("d.1.heartbeat").is_none());
	}

	#[tokio::test]
	async fn rebind_to_different_device_starts_new_without_stopping_old() {
		let publisher = Arc::new(RecordingPublisher::default());
		let controller = HeartbeatController::new(publisher.clone());

		controller.on_subscribe("shared.heartbeat", DeviceId::new("dev-1")).await;
		controller.on_subscribe("shared.heartbeat", DeviceId::new("dev-2")).await;

		assert_eq!(publisher.actions().await, vec!["START_HEARTBEAT", "START_HEARTBEAT"]);
		assert_eq!(controller.bound_device("shared.heartbeat"), Some(DeviceId::new("dev-2")));
	}
}
