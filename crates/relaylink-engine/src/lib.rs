//! Relayer protocol engine.
//!
//! This crate turns the wire protocol of `relaylink-protocol` into live
//! system state. The [`ProtocolEngine`] receives complete text lines from a
//! [`Transport`] collaborator, decodes them, applies them to the
//! [`Registry`] of nodes and devices, publishes typed [`EngineEvent`]s to
//! subscribers, and issues follow-up commands (the node-announce handshake).
//! A [`HeartbeatMonitor`] flags nodes that have gone silent.
//!
//! # Processing model
//!
//! One inbound line is fully processed (parse, registry mutation, event
//! publish, possible outbound command) before the next is read. All registry
//! mutations serialize through the engine's inbound path; the heartbeat
//! thread only flips status flags. External readers take snapshots, never
//! references into live state.

mod engine;
mod error;
mod events;
mod heartbeat;
mod registry;
mod transport;

pub use engine::*;
pub use error::*;
pub use events::*;
pub use heartbeat::*;
pub use registry::*;
pub use transport::*;
