//! Real-time task progress distribution.
//!
//! This crate provides the building blocks between the job runner and the
//! WebSocket layer:
//!
//! - [`ConnectionRegistry`]: every live client connection and, per task,
//!   the set of connections subscribed to it.
//! - [`UpdateChannel`]: best-effort, non-blocking fan-out of a
//!   [`ServerMessage`] to the subscribers of one task.
//! - [`message`]: the JSON frames exchanged with clients.

pub mod channel;
pub mod message;
pub mod registry;

pub use channel::UpdateChannel;
pub use message::{ClientMessage, OutboundFrame, ProtocolError, ServerMessage, ServerPayload};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Registration, RegistryStats};
