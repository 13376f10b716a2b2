use anyhow::{Context, Result, anyhow};
use crates::{
    domain::{
        entities::document_events::DocumentEventEntity,
        repositories::{
            document_events::DocumentEventRepository, payments::PaymentDocumentRepository,
        },
        value_objects::collections::PAYMENTS_COLLECTION,
    },
    payments::gateway::PaymentGateway,
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

use crate::usecases::charge_workflow::{ChargeDisposition, ChargeWorkflowUseCase};

/// Feeds every newly added payment request document to the charge workflow.
pub struct PaymentEventsLoop<E, P, G>
where
    E: DocumentEventRepository + 'static,
    P: PaymentDocumentRepository + 'static,
    G: PaymentGateway + 'static,
{
    event_repo: Arc<E>,
    payment_repo: Arc<P>,
    workflow: Arc<ChargeWorkflowUseCase<P, G>>,
    poll_interval: Duration,
    max_attempts: i32,
}

impl<E, P, G> PaymentEventsLoop<E, P, G>
where
    E: DocumentEventRepository + 'static,
    P: PaymentDocumentRepository + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(
        event_repo: Arc<E>,
        payment_repo: Arc<P>,
        workflow: Arc<ChargeWorkflowUseCase<P, G>>,
        poll_interval: Duration,
        max_attempts: i32,
    ) -> Self {
        Self {
            event_repo,
            payment_repo,
            workflow,
            poll_interval,
            max_attempts,
        }
    }

    pub async fn run(self) -> Result<()> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            max_attempts = self.max_attempts,
            "payment_events: starting worker loop"
        );
        loop {
            match self.poll_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    error!(error = %e, "payment_events: poll failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Handles at most one queued event. Returns `false` when the queue was empty.
    /// An event whose completion could not be recorded stays `running` and is
    /// reclaimed once its lease expires.
    pub async fn poll_once(&self) -> Result<bool> {
        let Some(event) = self
            .event_repo
            .lock_next_created_event(PAYMENTS_COLLECTION)
            .await?
        else {
            return Ok(false);
        };

        info!(
            event_id = %event.id,
            document_id = %event.doc_key,
            attempts = event.attempts,
            "payment_events: processing event"
        );

        match self.process_event(&event).await {
            Ok(disposition) => {
                info!(
                    event_id = %event.id,
                    disposition = ?disposition,
                    "payment_events: event processed"
                );
                self.event_repo
                    .mark_event_done(event.id)
                    .await
                    .with_context(|| format!("failed to mark event {} done", event.id))?;
            }
            Err(e) => {
                error!(
                    event_id = %event.id,
                    document_id = %event.doc_key,
                    error = %e,
                    "payment_events: failed to process event"
                );
                self.event_repo
                    .mark_event_failed(event.id, &e.to_string(), self.max_attempts)
                    .await
                    .with_context(|| format!("failed to mark event {} as failed", event.id))?;
            }
        }

        Ok(true)
    }

    async fn process_event(&self, event: &DocumentEventEntity) -> Result<ChargeDisposition> {
        let body = self
            .payment_repo
            .find_payment_document(&event.doc_key)
            .await?
            .ok_or_else(|| anyhow!("payment document {} not found", event.doc_key))?;

        Ok(self
            .workflow
            .handle_created_document(&event.doc_key, body)
            .await?)
    }
}
