use bytes::Bytes;

/// A single message received on an upstream bus subscription, forwarded to
/// the fan-out dispatcher untouched. Decoding the payload is the
/// dispatcher's job, not the manager's.
#[derive(Debug, Clone)]
pub struct BusMessage {
	pub subject: String,
	pub payload: Bytes,
}
