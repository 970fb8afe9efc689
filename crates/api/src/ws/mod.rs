//! WebSocket infrastructure for task progress.
//!
//! Provides the HTTP upgrade handler, the per-connection protocol loop and
//! the heartbeat that pings every open connection.

mod handler;
mod heartbeat;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
