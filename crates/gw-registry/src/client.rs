use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier for a connected client. Never reused within a
/// process lifetime, mirroring the gateway's `ws#<id>@<addr>` log label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
	pub fn next() -> Self {
		Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for ClientId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A handle to one open WebSocket connection.
///
/// Identity is by [`ClientId`] alone, not by peer address or any
/// client-supplied value, so a handle compares and hashes on `id`.
#[derive(Debug, Clone)]
pub struct ClientHandle {
	id: ClientId,
	peer: SocketAddr,
	outbound: mpsc::Sender<String>,
}

impl ClientHandle {
	pub fn new(peer: SocketAddr, outbound: mpsc::Sender<String>) -> Self {
		Self { id: ClientId::next(), peer, outbound }
	}

	pub fn id(&self) -> ClientId {
		self.id
	}

	pub fn peer(&self) -> SocketAddr {
		self.peer
	}

	/// Queues a text frame for delivery to this client. Delivery itself
	/// (including the per-send timeout) is the fan-out dispatcher's job;
	/// this only hands the frame to the connection's dedicated writer.
	pub async fn enqueue(&self, frame: String) -> Result<(), mpsc::error::SendError<String>> {
		self.outbound.send(frame).await
	}

	/// A human-readable label for logs, e.g. `ws#42@127.0.0.1:51514`.
	pub fn label(&self) -> String {
		format!("ws#{}@{}", self.id, self.peer)
	}
}

impl PartialEq for ClientHandle {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for ClientHandle {}

impl std::hash::Hash for ClientHandle {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Display for ClientHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.label())
	}
}
