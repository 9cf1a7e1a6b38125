use crate::error::PublishError;
use async_trait::async_trait;
use serde::Serialize;

/// A device identifier extracted from a `subscribe` frame's `uuid` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for DeviceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The three control actions the gateway may publish for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeartbeatAction {
	#[serde(rename = "START_HEARTBEAT")]
	Start,
	#[serde(rename = "RELOAD_HEARTBEAT")]
	Reload,
	#[serde(rename = "STOP_HEARTBEAT")]
	Stop,
}

#[derive(Debug, Serialize)]
struct HeartbeatControlPayload {
	event_type: &'static str,
	action: HeartbeatAction,
	data: serde_json::Value,
}

fn heartbeat_control_subject(device_id: &DeviceId) -> String {
	format!("device_communication.{}.command.heartbeat", device_id.as_str())
}

/// Abstracts "publish JSON bytes to a bus subject" so the controller can be
/// unit tested without a live bus connection.
#[async_trait]
pub trait ControlPublisher: Send + Sync {
	async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<(), PublishError>;
}

#[async_trait]
impl ControlPublisher for async_nats::Client {
	async fn publish(&self, subject: String, payload: Vec<u8>) -> Result<(), PublishError> {
		async_nats::Client::publish(self, subject, payload.into()).await?;
		Ok(())
	}
}

/// Publishes a single heartbeat control action for `device_id`, logging (but
/// not propagating) any failure. Control publishes never abort the
/// WebSocket operation that triggered them.
pub async fn publish_heartbeat_action(publisher: &(dyn ControlPublisher), device_id: &DeviceId, action: HeartbeatAction) {
	let subject = heartbeat_control_subject(device_id);
	let payload = HeartbeatControlPayload { event_type: "HEARTBEAT_CONTROL", action, data: serde_json::json!({}) };

	let body = match serde_json::to_vec(&payload) {
		Ok(body) => body,
		Err(err) => {
			tracing::error!(device_id = %device_id, error = %err, "failed to serialize heartbeat control payload");
			return;
		}
	};

	if let Err(err) = publisher.publish(subject.clone(), body).await {
		tracing::warn!(device_id = %device_id, subject, error = %err, "failed to publish heartbeat control action");
	}
}
