//! One-to-many delivery of inbound bus messages to WebSocket subscribers.

pub mod dispatcher;
pub mod envelope;

pub use dispatcher::{FanoutDispatcher, SEND_TIMEOUT};
pub use envelope::build_envelope;
