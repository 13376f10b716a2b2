//! Collection/key document primitives over the `documents` table.

use chrono::Utc;
use diesel::{
    prelude::*,
    sql_types::{Jsonb, Text, Timestamptz},
    upsert::excluded,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            document_events::InsertDocumentEventEntity,
            documents::{DocumentEntity, InsertDocumentEntity},
        },
        value_objects::enums::event_statuses::EventStatus,
    },
    infra::db::postgres::schema::{document_events, documents},
};

pub fn get_document(
    conn: &mut PgConnection,
    collection: &str,
    doc_key: &str,
) -> QueryResult<Option<Value>> {
    documents::table
        .filter(documents::collection.eq(collection))
        .filter(documents::doc_key.eq(doc_key))
        .select(DocumentEntity::as_select())
        .first::<DocumentEntity>(conn)
        .optional()
        .map(|document| document.map(|d| d.body))
}

/// Replaces the whole body, creating the document if it does not exist.
pub fn set_document(
    conn: &mut PgConnection,
    collection: &str,
    doc_key: &str,
    body: Value,
) -> QueryResult<()> {
    let insert_entity = InsertDocumentEntity::new(collection, doc_key, body);

    diesel::insert_into(documents::table)
        .values(&insert_entity)
        .on_conflict((documents::collection, documents::doc_key))
        .do_update()
        .set((
            documents::body.eq(excluded(documents::body)),
            documents::updated_at.eq(excluded(documents::updated_at)),
        ))
        .execute(conn)?;

    Ok(())
}

/// Shallow merge: top-level fields in `body` replace existing ones, all other
/// existing fields are kept.
pub fn merge_document(
    conn: &mut PgConnection,
    collection: &str,
    doc_key: &str,
    body: Value,
) -> QueryResult<()> {
    diesel::sql_query(
        "INSERT INTO documents (collection, doc_key, body, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $4) \
         ON CONFLICT (collection, doc_key) \
         DO UPDATE SET body = documents.body || EXCLUDED.body, updated_at = EXCLUDED.updated_at",
    )
    .bind::<Text, _>(collection)
    .bind::<Text, _>(doc_key)
    .bind::<Jsonb, _>(body)
    .bind::<Timestamptz, _>(Utc::now())
    .execute(conn)?;

    Ok(())
}

/// Inserts under a generated key and queues a create event in the same
/// transaction. Returns the generated key.
pub fn add_document(conn: &mut PgConnection, collection: &str, body: Value) -> QueryResult<String> {
    let doc_key = Uuid::new_v4().to_string();
    let insert_document = InsertDocumentEntity::new(collection, &doc_key, body);
    let insert_event = InsertDocumentEventEntity {
        collection: collection.to_string(),
        doc_key: doc_key.clone(),
        status: EventStatus::Queued.to_string(),
        attempts: 0,
        run_at: insert_document.created_at,
        created_at: insert_document.created_at,
    };

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(documents::table)
            .values(&insert_document)
            .execute(conn)?;
        diesel::insert_into(document_events::table)
            .values(&insert_event)
            .execute(conn)?;
        Ok(())
    })?;

    Ok(doc_key)
}
