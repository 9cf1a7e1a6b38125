//! Subject <-> client subscription index for the gateway.
//!
//! This crate owns exactly one piece of state: which WebSocket clients are
//! interested in which bus subjects. It knows nothing about the bus, about
//! WebSocket framing, or about heartbeats; those live in sibling crates and
//! react to the return values these methods produce.

pub mod client;
pub mod error;
pub mod registry;
pub mod subject;

pub use client::{ClientHandle, ClientId};
pub use error::RegistryError;
pub use registry::{AddOutcome, ClientRemovalOutcome, RemoveOutcome, SubscriptionRegistry};
pub use subject::normalize_subject;
