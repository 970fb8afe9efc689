//! Connection registry: live client connections and their task subscriptions.
//!
//! Both directions of the subscription relation are kept under one lock so
//! that `connections[c].tasks` contains `t` exactly when
//! `subscriptions[t]` contains `c`. Every connection owns a bounded
//! outbound queue; the registry only ever calls `try_send` on it, so no
//! delivery path can block on a slow client.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use smartrag_core::error::CoreError;
use smartrag_core::types::TaskId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::message::OutboundFrame;

/// Opaque identity of one client connection.
pub type ConnectionId = uuid::Uuid;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Returned by [`ConnectionRegistry::register`].
///
/// The caller drains `outbound` into the transport. The registry holds the
/// only sender, so the receiver yields `None` once the connection is
/// unregistered.
pub struct Registration {
    pub id: ConnectionId,
    pub outbound: mpsc::Receiver<OutboundFrame>,
}

/// Snapshot of a connection's send side, safe to use after the registry
/// lock has been released.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<OutboundFrame>,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Enqueue without waiting. Fails if the queue is full or the
    /// connection's writer has gone away.
    pub fn try_send(&self, frame: OutboundFrame) -> Result<(), CoreError> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => {
                CoreError::Transport(format!("Outbound queue full for connection {}", self.id))
            }
            TrySendError::Closed(_) => {
                CoreError::Transport(format!("Connection {} is closed", self.id))
            }
        })
    }
}

/// Aggregate counters exposed by the connection stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistryStats {
    pub total_connections: usize,
    /// Subscriber count per task id.
    pub task_subscriptions: BTreeMap<String, usize>,
}

struct ConnectionEntry {
    sender: mpsc::Sender<OutboundFrame>,
    tasks: HashSet<TaskId>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    subscriptions: HashMap<TaskId, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn remove(&mut self, id: ConnectionId) -> bool {
        let Some(entry) = self.connections.remove(&id) else {
            return false;
        };
        for task_id in entry.tasks {
            if let Some(subscribers) = self.subscriptions.get_mut(&task_id) {
                subscribers.remove(&id);
                if subscribers.is_empty() {
                    self.subscriptions.remove(&task_id);
                }
            }
        }
        true
    }
}

/// Shared registry of client connections.
///
/// Thread-safe via an interior `RwLock`; wrap in `Arc` and share between
/// connection handlers, the update channel and the heartbeat task.
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
    buffer: usize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_OUTBOUND_BUFFER)
    }

    /// Registry whose connections get an outbound queue of `buffer` frames.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            buffer: buffer.max(1),
        }
    }

    /// Add a connection with no subscriptions and a fresh id.
    pub async fn register(&self) -> Registration {
        let (sender, outbound) = mpsc::channel(self.buffer);
        let id = uuid::Uuid::new_v4();
        let entry = ConnectionEntry {
            sender,
            tasks: HashSet::new(),
        };
        self.state.write().await.connections.insert(id, entry);
        tracing::debug!(connection_id = %id, "Connection registered");
        Registration { id, outbound }
    }

    /// Remove a connection and all of its subscriptions.
    ///
    /// Idempotent. Returns true if the connection was present.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.state.write().await.remove(id);
        if removed {
            tracing::debug!(connection_id = %id, "Connection unregistered");
        }
        removed
    }

    /// Subscribe a connection to a task's updates.
    ///
    /// The task id is not validated. Subscribing twice is a no-op that
    /// still succeeds. Returns true if the subscription is new.
    pub async fn subscribe(&self, id: ConnectionId, task_id: TaskId) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        let entry = state
            .connections
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Connection", id))?;
        let added = entry.tasks.insert(task_id);
        state.subscriptions.entry(task_id).or_default().insert(id);
        Ok(added)
    }

    /// Subscribe and queue `ack` to the connection in one step.
    ///
    /// The acknowledgement is queued while the write lock is held, so no
    /// update for `task_id` can reach the connection ahead of it. If the
    /// queue rejects the acknowledgement the connection is dropped.
    pub async fn subscribe_with_ack(
        &self,
        id: ConnectionId,
        task_id: TaskId,
        ack: OutboundFrame,
    ) -> Result<bool, CoreError> {
        let mut state = self.state.write().await;
        let entry = state
            .connections
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found("Connection", id))?;
        let added = entry.tasks.insert(task_id);
        let handle = ConnectionHandle {
            id,
            sender: entry.sender.clone(),
        };
        state.subscriptions.entry(task_id).or_default().insert(id);

        if let Err(e) = handle.try_send(ack) {
            state.remove(id);
            tracing::debug!(
                connection_id = %id,
                task_id = %task_id,
                "Dropped connection on failed ack",
            );
            return Err(e);
        }
        Ok(added)
    }

    /// Drop one subscription. Returns true if it existed.
    pub async fn unsubscribe(&self, id: ConnectionId, task_id: TaskId) -> bool {
        let mut state = self.state.write().await;
        let removed = state
            .connections
            .get_mut(&id)
            .is_some_and(|entry| entry.tasks.remove(&task_id));
        if let Some(subscribers) = state.subscriptions.get_mut(&task_id) {
            subscribers.remove(&id);
            if subscribers.is_empty() {
                state.subscriptions.remove(&task_id);
            }
        }
        removed
    }

    /// Handles of every connection currently subscribed to `task_id`.
    pub async fn subscribers_of(&self, task_id: TaskId) -> Vec<ConnectionHandle> {
        let state = self.state.read().await;
        let Some(ids) = state.subscriptions.get(&task_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| {
                state.connections.get(id).map(|entry| ConnectionHandle {
                    id: *id,
                    sender: entry.sender.clone(),
                })
            })
            .collect()
    }

    /// Tasks a connection is subscribed to, or `None` if it is not registered.
    #[cfg(test)]
    pub(crate) async fn subscriptions_of(&self, id: ConnectionId) -> Option<HashSet<TaskId>> {
        self.state
            .read()
            .await
            .connections
            .get(&id)
            .map(|entry| entry.tasks.clone())
    }

    pub async fn is_registered(&self, id: ConnectionId) -> bool {
        self.state.read().await.connections.contains_key(&id)
    }

    /// Enqueue a frame for a single connection.
    ///
    /// A connection whose queue rejects the frame is unregistered.
    pub async fn send_to(&self, id: ConnectionId, frame: OutboundFrame) -> Result<(), CoreError> {
        let handle = {
            let state = self.state.read().await;
            state
                .connections
                .get(&id)
                .map(|entry| ConnectionHandle {
                    id,
                    sender: entry.sender.clone(),
                })
                .ok_or_else(|| CoreError::not_found("Connection", id))?
        };

        if let Err(e) = handle.try_send(frame) {
            tracing::warn!(connection_id = %id, error = %e, "Dropping connection after failed send");
            self.unregister(id).await;
            return Err(e);
        }
        Ok(())
    }

    /// Unregister every connection in `ids`. Returns how many were present.
    pub async fn reap(&self, ids: &[ConnectionId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut state = self.state.write().await;
        let removed = ids.iter().filter(|id| state.remove(**id)).count();
        if removed > 0 {
            tracing::info!(removed, "Reaped unreachable connections");
        }
        removed
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.read().await;
        RegistryStats {
            total_connections: state.connections.len(),
            task_subscriptions: state
                .subscriptions
                .iter()
                .map(|(task_id, subscribers)| (task_id.to_string(), subscribers.len()))
                .collect(),
        }
    }

    /// Queue a ping on every connection, reaping those that cannot accept it.
    ///
    /// Returns the number of connections pinged.
    pub async fn ping_all(&self) -> usize {
        let handles: Vec<ConnectionHandle> = {
            let state = self.state.read().await;
            state
                .connections
                .iter()
                .map(|(id, entry)| ConnectionHandle {
                    id: *id,
                    sender: entry.sender.clone(),
                })
                .collect()
        };

        let mut failed = Vec::new();
        for handle in &handles {
            if handle.try_send(OutboundFrame::Ping).is_err() {
                failed.push(handle.id());
            }
        }
        self.reap(&failed).await;
        handles.len() - failed.len()
    }

    /// Queue a close frame on every connection, then clear the registry.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) -> usize {
        let mut state = self.state.write().await;
        let count = state.connections.len();
        for entry in state.connections.values() {
            let _ = entry.sender.try_send(OutboundFrame::Close);
        }
        state.connections.clear();
        state.subscriptions.clear();
        tracing::info!(count, "Closed all client connections");
        count
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
