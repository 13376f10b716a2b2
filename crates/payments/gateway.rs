use async_trait::async_trait;
use mockall::automock;

use crate::{
    domain::value_objects::provisioning::CardDetails,
    payments::stripe_client::{
        NewCharge, StripeCardSource, StripeCharge, StripeClient, StripeCustomer, StripeResult,
        StripeToken,
    },
};

/// The payment-processor operations the workflows depend on.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, email: Option<String>) -> StripeResult<StripeCustomer>;

    async fn create_card_token(&self, card: CardDetails) -> StripeResult<StripeToken>;

    async fn attach_source(&self, customer_id: &str, token_id: &str) -> StripeResult<StripeCardSource>;

    async fn retrieve_customer(&self, customer_id: &str) -> StripeResult<Option<StripeCustomer>>;

    async fn create_charge(&self, charge: NewCharge) -> StripeResult<StripeCharge>;
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_customer(&self, email: Option<String>) -> StripeResult<StripeCustomer> {
        self.create_customer(email.as_deref()).await
    }

    async fn create_card_token(&self, card: CardDetails) -> StripeResult<StripeToken> {
        self.create_card_token(&card).await
    }

    async fn attach_source(&self, customer_id: &str, token_id: &str) -> StripeResult<StripeCardSource> {
        self.create_source(customer_id, token_id).await
    }

    async fn retrieve_customer(&self, customer_id: &str) -> StripeResult<Option<StripeCustomer>> {
        self.retrieve_customer(customer_id).await
    }

    async fn create_charge(&self, charge: NewCharge) -> StripeResult<StripeCharge> {
        self.create_charge(&charge).await
    }
}
