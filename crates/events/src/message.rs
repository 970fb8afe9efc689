//! JSON frames exchanged over a client connection.
//!
//! Inbound frames are [`ClientMessage`]s; outbound frames are
//! [`ServerMessage`]s, each stamped with a server-side UTC timestamp. One
//! WebSocket text frame carries exactly one JSON object.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use smartrag_core::task::{Task, TaskStatus};
use smartrag_core::types::{TaskId, Timestamp};

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A control message sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// `{"type": "subscribe_task", "task_id": "<uuid>"}`
    SubscribeTask { task_id: TaskId },
    /// `{"type": "unsubscribe_task", "task_id": "<uuid>"}`; no reply.
    UnsubscribeTask { task_id: TaskId },
    /// `{"type": "ping"}`
    Ping,
}

/// Why an inbound frame could not be interpreted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Binary frames are not supported")]
    BinaryFrame,
}

impl ClientMessage {
    /// Parse one text frame.
    ///
    /// Syntax errors and structural errors are reported separately so the
    /// client can tell a truncated frame from an unknown message type.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Message body, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPayload {
    TaskUpdate {
        task_id: TaskId,
        status: TaskStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    SubscriptionConfirmed {
        task_id: TaskId,
    },
    Error {
        message: String,
    },
    Pong,
}

/// An outbound frame: a payload plus the server time it was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    #[serde(flatten)]
    pub payload: ServerPayload,
    pub timestamp: Timestamp,
}

impl ServerMessage {
    pub fn new(payload: ServerPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn task_update(
        task_id: TaskId,
        status: TaskStatus,
        progress: Option<f64>,
        message: Option<String>,
    ) -> Self {
        Self::new(ServerPayload::TaskUpdate {
            task_id,
            status,
            progress,
            message,
        })
    }

    /// Snapshot of a task's status and progress.
    pub fn from_task(task: &Task, message: impl Into<String>) -> Self {
        Self::task_update(task.id, task.status, Some(task.progress), Some(message.into()))
    }

    pub fn subscription_confirmed(task_id: TaskId) -> Self {
        Self::new(ServerPayload::SubscriptionConfirmed { task_id })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ServerPayload::Error {
            message: message.into(),
        })
    }

    pub fn pong() -> Self {
        Self::new(ServerPayload::Pong)
    }

    /// The `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self.payload {
            ServerPayload::TaskUpdate { .. } => "task_update",
            ServerPayload::SubscriptionConfirmed { .. } => "subscription_confirmed",
            ServerPayload::Error { .. } => "error",
            ServerPayload::Pong => "pong",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What a connection's outbound queue carries.
///
/// `Ping` and `Close` are transport-level control frames; everything a
/// client reads as JSON is a `Message`.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Message(ServerMessage),
    Ping,
    Close,
}

impl From<ServerMessage> for OutboundFrame {
    fn from(message: ServerMessage) -> Self {
        Self::Message(message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
