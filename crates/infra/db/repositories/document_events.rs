use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::{
    pg::Pg,
    prelude::*,
    query_builder::{BoxedSqlQuery, SqlQuery},
    sql_query,
    sql_types::{Text, Timestamptz},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{
        entities::document_events::DocumentEventEntity,
        repositories::document_events::DocumentEventRepository,
        value_objects::enums::event_statuses::EventStatus,
    },
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::document_events},
};

pub struct DocumentEventPostgres {
    db_pool: Arc<PgPoolSquad>,
    worker_id: String,
    lease: Duration,
}

impl DocumentEventPostgres {
    /// `lease` bounds how long an event may stay `running` before another
    /// poll hands it out again.
    pub fn new(db_pool: Arc<PgPoolSquad>, lease: Duration) -> Self {
        Self {
            db_pool,
            worker_id: Uuid::new_v4().to_string(),
            lease,
        }
    }
}

const CLAIM_NEXT_EVENT_SQL: &str = "\
UPDATE document_events \
SET status = $5, locked_at = $2, locked_by = $3 \
WHERE id = ( \
    SELECT id FROM document_events \
    WHERE collection = $1 \
      AND ((status = $6 AND run_at <= $2) OR (status = $5 AND locked_at < $4)) \
    ORDER BY run_at ASC \
    LIMIT 1 \
    FOR UPDATE SKIP LOCKED \
) \
RETURNING id, collection, doc_key, status, attempts, run_at, locked_at, locked_by, error, created_at";

/// Locks held since before this instant are considered abandoned.
pub fn stale_lock_cutoff(now: DateTime<Utc>, lease: Duration) -> DateTime<Utc> {
    now - lease
}

/// Claims the oldest due `queued` event of `collection`, or a `running` one
/// whose lock is older than `stale_before`.
pub fn claim_next_event_query(
    collection: &str,
    worker_id: &str,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
    sql_query(CLAIM_NEXT_EVENT_SQL)
        .into_boxed::<Pg>()
        .bind::<Text, _>(collection.to_string())
        .bind::<Timestamptz, _>(now)
        .bind::<Text, _>(worker_id.to_string())
        .bind::<Timestamptz, _>(stale_before)
        .bind::<Text, _>(EventStatus::Running.as_str().to_string())
        .bind::<Text, _>(EventStatus::Queued.as_str().to_string())
}

/// Delay before the next delivery attempt: 5s, 25s, 125s...
pub fn retry_backoff(attempts: i32) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 6) as u32;
    Duration::seconds(5 * 5_i64.pow(exponent))
}

#[async_trait]
impl DocumentEventRepository for DocumentEventPostgres {
    async fn lock_next_created_event(
        &self,
        collection: &str,
    ) -> Result<Option<DocumentEventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let current_time = Utc::now();
        let stale_before = stale_lock_cutoff(current_time, self.lease);

        let event = claim_next_event_query(collection, &self.worker_id, current_time, stale_before)
            .get_result::<DocumentEventEntity>(&mut conn)
            .optional()?;

        Ok(event)
    }

    async fn mark_event_done(&self, event_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        diesel::update(document_events::table.find(event_id))
            .set((
                document_events::status.eq(EventStatus::Done.as_str()),
                document_events::locked_at.eq::<Option<DateTime<Utc>>>(None),
                document_events::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn mark_event_failed(&self, event_id: Uuid, err: &str, max_attempts: i32) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let current_time = Utc::now();

        let attempts = document_events::table
            .find(event_id)
            .select(document_events::attempts)
            .first::<i32>(&mut conn)?;

        let new_attempts = attempts + 1;
        let (new_status, next_run_at) = if new_attempts < max_attempts {
            (EventStatus::Queued, current_time + retry_backoff(new_attempts))
        } else {
            (EventStatus::Dead, current_time)
        };

        diesel::update(document_events::table.find(event_id))
            .set((
                document_events::status.eq(new_status.as_str()),
                document_events::attempts.eq(new_attempts),
                document_events::error.eq(Some(err)),
                document_events::run_at.eq(next_run_at),
                document_events::locked_at.eq::<Option<DateTime<Utc>>>(None),
                document_events::locked_by.eq::<Option<String>>(None),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use diesel::debug_query;

    #[test]
    fn claim_reclaims_running_events_past_their_lease() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let stale_before = stale_lock_cutoff(now, Duration::seconds(300));
        let query = claim_next_event_query("payments", "worker-1", now, stale_before);

        let rendered = debug_query::<Pg, _>(&query).to_string();

        assert!(rendered.contains("(status = $6 AND run_at <= $2)"), "{rendered}");
        assert!(rendered.contains("OR (status = $5 AND locked_at < $4)"), "{rendered}");
        assert!(rendered.contains("FOR UPDATE SKIP LOCKED"), "{rendered}");
        assert!(rendered.contains(&format!("{stale_before:?}")), "{rendered}");
        assert!(rendered.contains("\"running\""), "{rendered}");
        assert!(rendered.contains("\"queued\""), "{rendered}");
    }

    #[test]
    fn stale_cutoff_is_one_lease_before_now() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();

        assert_eq!(
            stale_lock_cutoff(now, Duration::seconds(300)),
            Utc.with_ymd_and_hms(2026, 10, 16, 11, 55, 0).unwrap()
        );
    }

    #[test]
    fn backoff_grows_by_factor_of_five() {
        assert_eq!(retry_backoff(1), Duration::seconds(5));
        assert_eq!(retry_backoff(2), Duration::seconds(25));
        assert_eq!(retry_backoff(3), Duration::seconds(125));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(retry_backoff(50), retry_backoff(7));
        assert_eq!(retry_backoff(0), Duration::seconds(5));
    }
}
