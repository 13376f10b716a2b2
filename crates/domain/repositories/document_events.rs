use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::document_events::DocumentEventEntity;

#[automock]
#[async_trait]
pub trait DocumentEventRepository: Send + Sync {
    async fn lock_next_created_event(&self, collection: &str)
    -> Result<Option<DocumentEventEntity>>;

    async fn mark_event_done(&self, event_id: Uuid) -> Result<()>;

    /// Re-queues the event with backoff, or marks it dead once `max_attempts`
    /// is reached.
    async fn mark_event_failed(&self, event_id: Uuid, err: &str, max_attempts: i32)
    -> Result<()>;
}
