use crate::protocol::{ErrorCode, ErrorFrame, InboundFrame};
use gw_bus::BusSubscriptions;
use gw_heartbeat::{heartbeat_flavor, ControlPublisher, HeartbeatController};
use gw_registry::{normalize_subject, ClientHandle, SubscriptionRegistry};
use std::collections::HashSet;
use std::sync::Arc;

/// Per-connection control-message state machine. Holds no socket I/O
/// itself: the caller feeds it raw text frames and forwards any returned
/// error frame back to the client, and calls [`SessionHandler::disconnect`]
/// exactly once when the connection's read loop ends.
pub struct SessionHandler<P: ControlPublisher, B: BusSubscriptions> {
	registry: Arc<SubscriptionRegistry>,
	bus: Arc<B>,
	heartbeat: Arc<HeartbeatController<P>>,
	heartbeat_event_name: Arc<str>,
	client: ClientHandle,
}

impl<P: ControlPublisher, B: BusSubscriptions> SessionHandler<P, B> {
	pub fn new(registry: Arc<SubscriptionRegistry>, bus: Arc<B>, heartbeat: Arc<HeartbeatController<P>>, heartbeat_event_name: Arc<str>, client: ClientHandle) -> Self {
		registry.register_client(&client);
		Self { registry, bus, heartbeat, heartbeat_event_name, client }
	}

	pub fn client(&self) -> &ClientHandle {
		&self.client
	}

	/// Processes one raw text frame. Returns the error frame to send back
	/// to the client, if the frame was rejected; `None` means the action
	/// (including any side effects it had) completed normally.
	pub async fn handle_frame(&self, raw: &str) -> Option<ErrorFrame> {
		let value: serde_json::Value = match serde_json::from_str(raw) {
			Ok(value) => value,
			Err(_) => return Some(ErrorFrame::new(ErrorCode::InvalidJson, "frame is not valid JSON")),
		};

		if !value.is_object() {
			return Some(ErrorFrame::new(ErrorCode::InvalidJson, "frame must be a JSON object"));
		}

		let frame: InboundFrame = match serde_json::from_value(value) {
			Ok(frame) => frame,
			Err(err) => return Some(ErrorFrame::new(ErrorCode::InvalidPayload, format!("malformed frame: {err}"))),
		};

		match frame.action.as_str() {
			"subscribe" => self.handle_subscribe(frame).await,
			"unsubscribe" => self.handle_unsubscribe(frame).await,
			"unsubscribe_many" => self.handle_unsubscribe_many(frame).await,
			other => Some(ErrorFrame::new(ErrorCode::UnknownAction, format!("unknown action '{other}'"))),
		}
	}

	async fn handle_subscribe(&self, frame: InboundFrame) -> Option<ErrorFrame> {
		let Some(raw_subject) = frame.subject else {
			return Some(ErrorFrame::new(ErrorCode::InvalidPayload, "'subscribe' requires a 'subject' field"));
		};
		let subject = match normalize_subject(&raw_subject) {
			Ok(subject) => subject,
			Err(_) => return Some(ErrorFrame::new(ErrorCode::InvalidSubject, "subject must be non-empty")),
		};

		let outcome = self.registry.add_subscription(&subject, &self.client);

		if outcome.added {
			if let Err(err) = self.bus.start(&subject).await {
				tracing::warn!(subject = subject.as_str(), client = %self.client, error = %err, "upstream subscribe failed, rolling back");
				self.registry.remove_subscription(&subject, &self.client);
				return Some(ErrorFrame::new(ErrorCode::NatsSubscribeFailed, "failed to subscribe upstream"));
			}
		}

		// Heartbeat arming runs on every accepted subscribe, not only the
		// first: a repeat subscribe to an already-armed subject is how a
		// device re-requests its RELOAD_HEARTBEAT.
		if let Some(device_id) = heartbeat_flavor(frame.event.as_deref(), frame.uuid.as_deref(), &self.heartbeat_event_name) {
			self.heartbeat.on_subscribe(&subject, device_id).await;
		}

		None
	}

	async fn handle_unsubscribe(&self, frame: InboundFrame) -> Option<ErrorFrame> {
		let Some(raw_subject) = frame.subject else {
			return Some(ErrorFrame::new(ErrorCode::InvalidPayload, "'unsubscribe' requires a 'subject' field"));
		};
		let subject = match normalize_subject(&raw_subject) {
			Ok(subject) => subject,
			Err(_) => return Some(ErrorFrame::new(ErrorCode::InvalidSubject, "subject must be non-empty")),
		};

		self.unsubscribe_one(&subject).await;
		None
	}

	async fn handle_unsubscribe_many(&self, frame: InboundFrame) -> Option<ErrorFrame> {
		let Some(subjects) = frame.subjects else {
			return Some(ErrorFrame::new(ErrorCode::InvalidPayload, "'unsubscribe_many' requires a 'subjects' array"));
		};

		let mut normalized = Vec::with_capacity(subjects.len());
		for raw_subject in &subjects {
			match normalize_subject(raw_subject) {
				Ok(subject) => normalized.push(subject),
				Err(_) => return Some(ErrorFrame::new(ErrorCode::InvalidSubjects, "'subjects' entries must be non-empty")),
			}
		}

		let mut seen = HashSet::new();
		for subject in normalized {
			if seen.insert(subject.clone()) {
				self.unsubscribe_one(&subject).await;
			}
		}

		None
	}

	async fn unsubscribe_one(&self, subject: &str) {
		let outcome = self.registry.remove_subscription(subject, &self.client);
		if outcome.removed {
			self.bus.stop(subject).await;
		}
		if outcome.emptied {
			self.heartbeat.on_subject_emptied(subject).await;
		}
	}

	/// Drains every subject this connection held, tearing down the
	/// upstream subscription and heartbeat binding for each one that
	/// emptied as a result. Call exactly once, when the connection's
	/// read loop exits for any reason.
	pub async fn disconnect(&self) {
		let outcome = self.registry.remove_client(self.client.id());

		for subject in &outcome.removed_subjects {
			self.bus.stop(subject).await;
		}
		for subject in &outcome.emptied_subjects {
			self.heartbeat.on_subject_emptied(subject).await;
		}

		tracing::info!(client = %self.client, affected = outcome.removed_subjects.len(), emptied = outcome.emptied_subjects.len(), "connection disconnected");
	}
}
