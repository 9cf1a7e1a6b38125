use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal startup errors only. Every per-connection and per-message failure
/// is handled locally (logged, or reported to the originating client) and
/// never surfaces here.
#[derive(Error, Debug)]
pub enum Error {
	#[error("failed to connect to bus at {url}: {source}")]
	BusConnect { url: String, source: async_nats::ConnectError },

	#[error("failed to bind WebSocket listener on {addr}: {source}")]
	Bind { addr: String, source: std::io::Error },

	#[error("server error: {0}")]
	Serve(#[from] std::io::Error),
}
