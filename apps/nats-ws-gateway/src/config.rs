/// Gateway configuration, loaded once from the environment at startup. A
/// `.env` file in the working directory is loaded first if present so
/// local development doesn't require exporting every variable by hand.
///
/// Malformed values fall back to their documented default rather than
/// aborting startup, matching the original gateway's permissive loading.
#[derive(Debug, Clone)]
pub struct Config {
	pub nats_url: String,
	pub nats_client_name: String,
	pub ws_host: String,
	pub ws_port: u16,
	/// Accepted for parity with the original gateway's rotating file
	/// handler. This implementation logs to stdout/stderr only; a
	/// file-writing `tracing` layer would read this field.
	pub log_dir: String,
	pub log_level: String,
	pub heartbeat_event_name: String,
}

impl Config {
	pub fn from_env() -> Self {
		dotenv::dotenv().ok();

		Self {
			nats_url: env_or("NATS_URL", "nats://127.0.0.1:4222"),
			nats_client_name: env_or("NATS_CLIENT_NAME", "nats-ws-gateway"),
			ws_host: env_or("WS_HOST", "0.0.0.0"),
			ws_port: std::env::var("WS_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8765),
			log_dir: env_or("LOG_DIR", "logs"),
			log_level: env_or("LOG_LEVEL", "info"),
			heartbeat_event_name: env_or("HEARTBEAT_EVENT_NAME", "microcontroller_heartbeat"),
		}
	}

	pub fn bind_addr(&self) -> String {
		format!("{}:{}", self.ws_host, self.ws_port)
	}
}

fn env_or(key: &str, default: &str) -> String {
	std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bind_addr_joins_host_and_port() {
		let config = Config { nats_url: String::new(), nats_client_name: String::new(), ws_host: "0.0.0.0".to_string(), ws_port: 8765, log_dir: String::new(), log_level: String::new(), heartbeat_event_name: String::new() };
		assert_eq!(config.bind_addr(), "0.0.0.0:8765");
	}
}
