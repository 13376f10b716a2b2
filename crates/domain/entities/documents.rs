use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::infra::db::postgres::schema::documents;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = documents, primary_key(collection, doc_key))]
pub struct DocumentEntity {
    pub collection: String,
    pub doc_key: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = documents)]
pub struct InsertDocumentEntity {
    pub collection: String,
    pub doc_key: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsertDocumentEntity {
    pub fn new(collection: &str, doc_key: &str, body: Value) -> Self {
        let now = Utc::now();
        Self {
            collection: collection.to_string(),
            doc_key: doc_key.to_string(),
            body,
            created_at: now,
            updated_at: now,
        }
    }
}
