use serde::{Deserialize, Serialize};

/// A parsed control frame from a WebSocket client. `action` drives
/// dispatch; the remaining fields are validated per-action.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
	pub action: String,
	pub subject: Option<String>,
	pub subjects: Option<Vec<String>>,
	pub uuid: Option<String>,
	pub event: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidJson,
	InvalidPayload,
	InvalidSubject,
	InvalidSubjects,
	NatsSubscribeFailed,
	UnknownAction,
}

#[derive(Debug, Serialize)]
pub struct ErrorFrame {
	#[serde(rename = "type")]
	pub kind: &'static str,
	pub code: ErrorCode,
	pub message: String,
}

impl ErrorFrame {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self { kind: "error", code, message: message.into() }
	}

	pub fn to_json(&self) -> String {
		serde_json::to_string(self).expect("ErrorFrame always serializes")
	}
}
