pub mod config;
pub mod error;
pub mod service;
pub mod state;
pub mod ws;

pub use config::Config;
pub use error::{Error, Result};
pub use service::GatewayService;
pub use state::AppState;
