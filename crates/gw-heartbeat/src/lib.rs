//! Device heartbeat control-publish side effects.
//!
//! Subscribing to a heartbeat-flavored subject arms a remote device's
//! heartbeat; the last interest in that subject disarms it. This crate
//! only emits the control publishes; it has no opinion on WebSocket
//! framing or subscription bookkeeping.

pub mod controller;
pub mod error;
pub mod publisher;

pub use controller::{heartbeat_flavor, HeartbeatController};
pub use error::PublishError;
pub use publisher::{ControlPublisher, DeviceId, HeartbeatAction};
