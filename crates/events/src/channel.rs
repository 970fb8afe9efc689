//! Fan-out of task updates to subscribed connections.
//!
//! Publishing never blocks and never fails from the caller's point of view:
//! a subscriber that cannot take the message is unregistered after the pass
//! and the remaining subscribers still receive it.

use std::sync::Arc;

use smartrag_core::task::Task;
use smartrag_core::types::TaskId;

use crate::message::{OutboundFrame, ServerMessage};
use crate::registry::ConnectionRegistry;

/// Delivers [`ServerMessage`]s to the subscribers of a task.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct UpdateChannel {
    registry: Arc<ConnectionRegistry>,
}

impl UpdateChannel {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Send `message` to every connection subscribed to `task_id`.
    ///
    /// Returns the number of connections the message was queued on. Per
    /// connection, messages published by one caller arrive in publish order.
    pub async fn publish(&self, task_id: TaskId, message: ServerMessage) -> usize {
        let subscribers = self.registry.subscribers_of(task_id).await;
        if subscribers.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        let mut failed = Vec::new();
        for handle in &subscribers {
            match handle.try_send(OutboundFrame::Message(message.clone())) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(
                        task_id = %task_id,
                        connection_id = %handle.id(),
                        error = %e,
                        "Update not delivered",
                    );
                    failed.push(handle.id());
                }
            }
        }

        self.registry.reap(&failed).await;
        delivered
    }

    /// Publish a `task_update` snapshot of `task`.
    pub async fn publish_task(&self, task: &Task, message: impl Into<String>) -> usize {
        self.publish(task.id, ServerMessage::from_task(task, message))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use smartrag_core::task::TaskStatus;

    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let channel = UpdateChannel::new(Arc::new(ConnectionRegistry::new()));
        let delivered = channel
            .publish(uuid::Uuid::new_v4(), ServerMessage::pong())
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn publish_reaches_only_subscribers() {
        let registry = Arc::new(ConnectionRegistry::new());
        let channel = UpdateChannel::new(Arc::clone(&registry));
        let mut subscriber = registry.register().await;
        let mut bystander = registry.register().await;
        let task = uuid::Uuid::new_v4();
        registry.subscribe(subscriber.id, task).await.unwrap();

        let msg = ServerMessage::task_update(task, TaskStatus::Running, Some(10.0), None);
        assert_eq!(channel.publish(task, msg.clone()).await, 1);

        assert_eq!(subscriber.outbound.recv().await, Some(OutboundFrame::Message(msg)));
        assert!(bystander.outbound.try_recv().is_err());
    }
}
