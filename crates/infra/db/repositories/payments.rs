use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    domain::{
        repositories::payments::PaymentDocumentRepository,
        value_objects::{
            charge_outcomes::ChargeOutcome,
            collections::{PAYMENT_FAILURES_COLLECTION, PAYMENTS_COLLECTION},
            payment_failures::PaymentFailureRecord,
            payment_requests::PaymentRequest,
        },
    },
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::documents},
};

pub struct PaymentDocumentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentDocumentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PaymentDocumentRepository for PaymentDocumentPostgres {
    async fn add_payment_request(&self, request: PaymentRequest) -> Result<String> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let body = serde_json::to_value(request)?;

        let document_id = documents::add_document(&mut conn, PAYMENTS_COLLECTION, body)?;
        Ok(document_id)
    }

    async fn find_payment_document(&self, document_id: &str) -> Result<Option<Value>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        Ok(documents::get_document(&mut conn, PAYMENTS_COLLECTION, document_id)?)
    }

    async fn find_outcome(&self, reference_id: &str) -> Result<Option<Value>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        Ok(documents::get_document(&mut conn, PAYMENTS_COLLECTION, reference_id)?)
    }

    async fn write_outcome(&self, reference_id: &str, outcome: ChargeOutcome) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let body = serde_json::to_value(outcome)?;

        documents::set_document(&mut conn, PAYMENTS_COLLECTION, reference_id, body)?;
        Ok(())
    }

    async fn find_failure(&self, reference_id: &str) -> Result<Option<Value>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        Ok(documents::get_document(
            &mut conn,
            PAYMENT_FAILURES_COLLECTION,
            reference_id,
        )?)
    }

    async fn record_failure(&self, failure: PaymentFailureRecord) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let reference_id = failure.reference_id.clone();
        let body = serde_json::to_value(failure)?;

        documents::set_document(&mut conn, PAYMENT_FAILURES_COLLECTION, &reference_id, body)?;
        Ok(())
    }
}
