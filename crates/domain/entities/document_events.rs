use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::document_events;

/// A pending "document created" notification. One row is written alongside
/// every document added with a system-generated key.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, QueryableByName)]
#[diesel(table_name = document_events)]
pub struct DocumentEventEntity {
    pub id: Uuid,
    pub collection: String,
    pub doc_key: String,
    pub status: String,
    pub attempts: i32,
    pub run_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = document_events)]
pub struct InsertDocumentEventEntity {
    pub collection: String,
    pub doc_key: String,
    pub status: String,
    pub attempts: i32,
    pub run_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
