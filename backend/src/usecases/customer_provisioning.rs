use std::sync::Arc;

use crates::{
    domain::{
        repositories::users::UserRepository,
        value_objects::provisioning::{
            ProvisionCustomerModel, ProvisionRequestError, UserCustomerLink,
        },
    },
    payments::{gateway::PaymentGateway, stripe_client::StripeError},
};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    InvalidRequest(#[from] ProvisionRequestError),
    #[error("could not create customer: {0}")]
    CustomerCreation(StripeError),
    #[error("could not create card token: {0}")]
    CardTokenization(StripeError),
    #[error("could not attach card to customer: {0}")]
    SourceAttachment(StripeError),
    #[error("could not save customer to user record: {0}")]
    UserRecord(anyhow::Error),
}

pub type UseCaseResult<T> = std::result::Result<T, ProvisioningError>;

/// Creates a processor customer, attaches a card to it and links it to a user.
///
/// Steps run strictly in order and stop at the first failure. Nothing is
/// rolled back: a customer created before a later step fails stays orphaned
/// at the processor.
pub struct CustomerProvisioningUseCase<U, G>
where
    U: UserRepository + 'static,
    G: PaymentGateway + 'static,
{
    user_repo: Arc<U>,
    gateway: Arc<G>,
}

impl<U, G> CustomerProvisioningUseCase<U, G>
where
    U: UserRepository + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(user_repo: Arc<U>, gateway: Arc<G>) -> Self {
        Self { user_repo, gateway }
    }

    /// Returns the new customer id.
    pub async fn provision(&self, model: ProvisionCustomerModel) -> UseCaseResult<String> {
        let user_id = model.user_id;
        info!(%user_id, has_email = model.email.is_some(), "provisioning: started");

        let customer = self
            .gateway
            .create_customer(model.email)
            .await
            .map_err(|err| {
                error!(%user_id, error = ?err, "provisioning: failed to create customer");
                ProvisioningError::CustomerCreation(err)
            })?;
        let customer_id = customer.id;
        info!(%user_id, %customer_id, "provisioning: customer created");

        let token = self
            .gateway
            .create_card_token(model.card)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    error = ?err,
                    "provisioning: failed to tokenize card, customer left without source"
                );
                ProvisioningError::CardTokenization(err)
            })?;

        let source = self
            .gateway
            .attach_source(&customer_id, &token.id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    error = ?err,
                    "provisioning: failed to attach card source"
                );
                ProvisioningError::SourceAttachment(err)
            })?;
        info!(
            %user_id,
            %customer_id,
            source_id = %source.id,
            "provisioning: card source attached"
        );

        let link = UserCustomerLink {
            customer: customer_id.clone(),
            phone: model.phone,
        };
        self.user_repo
            .link_customer(&user_id, link)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    db_error = ?err,
                    "provisioning: failed to write user record"
                );
                ProvisioningError::UserRecord(err)
            })?;

        info!(%user_id, %customer_id, "provisioning: completed");
        Ok(customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use crates::{
        domain::{
            repositories::users::MockUserRepository, value_objects::provisioning::CardDetails,
        },
        payments::{
            gateway::MockPaymentGateway,
            stripe_client::{StripeCardSource, StripeCustomer, StripeToken},
        },
    };

    fn api_error(context: &'static str, status: u16, message: &str) -> StripeError {
        StripeError::Api {
            context,
            status,
            message: message.to_string(),
        }
    }

    fn sample_model(phone: Option<&str>) -> ProvisionCustomerModel {
        ProvisionCustomerModel {
            user_id: "user-1".to_string(),
            email: Some("jane@example.com".to_string()),
            card: CardDetails {
                name: "Jane Doe".to_string(),
                number: "4242424242424242".to_string(),
                exp_month: "12".to_string(),
                exp_year: "2030".to_string(),
                cvc: "123".to_string(),
            },
            phone: phone.map(str::to_string),
        }
    }

    fn customer(id: &str) -> StripeCustomer {
        StripeCustomer {
            id: id.to_string(),
            email: Some("jane@example.com".to_string()),
            default_source: None,
            deleted: false,
        }
    }

    fn gateway_until_attach() -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .times(1)
            .withf(|email: &Option<String>| email.as_deref() == Some("jane@example.com"))
            .returning(|_| Ok(customer("cus_new")));
        gateway
            .expect_create_card_token()
            .times(1)
            .withf(|card: &CardDetails| card.number == "4242424242424242")
            .returning(|_| {
                Ok(StripeToken {
                    id: "tok_1".to_string(),
                })
            });
        gateway
    }

    fn attach_ok(gateway: &mut MockPaymentGateway) {
        gateway
            .expect_attach_source()
            .times(1)
            .withf(|customer_id: &str, token_id: &str| {
                customer_id == "cus_new" && token_id == "tok_1"
            })
            .returning(|_, _| {
                Ok(StripeCardSource {
                    id: "card_1".to_string(),
                    brand: Some("Visa".to_string()),
                    last4: Some("4242".to_string()),
                })
            });
    }

    #[tokio::test]
    async fn links_new_customer_and_phone_to_user() {
        let mut gateway = gateway_until_attach();
        attach_ok(&mut gateway);

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_link_customer()
            .times(1)
            .withf(|user_id: &str, link: &UserCustomerLink| {
                user_id == "user-1"
                    && link.customer == "cus_new"
                    && link.phone.as_deref() == Some("+15550100")
            })
            .returning(|_, _| Ok(()));

        let usecase = CustomerProvisioningUseCase::new(Arc::new(user_repo), Arc::new(gateway));
        let customer_id = usecase
            .provision(sample_model(Some("+15550100")))
            .await
            .unwrap();

        assert_eq!(customer_id, "cus_new");
    }

    #[tokio::test]
    async fn omits_phone_when_not_supplied() {
        let mut gateway = gateway_until_attach();
        attach_ok(&mut gateway);

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_link_customer()
            .times(1)
            .withf(|_: &str, link: &UserCustomerLink| {
                link.customer == "cus_new" && link.phone.is_none()
            })
            .returning(|_, _| Ok(()));

        let usecase = CustomerProvisioningUseCase::new(Arc::new(user_repo), Arc::new(gateway));

        assert!(usecase.provision(sample_model(None)).await.is_ok());
    }

    #[tokio::test]
    async fn customer_failure_stops_before_tokenizing() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .times(1)
            .returning(|_| Err(api_error("create customer", 500, "boom")));
        gateway.expect_create_card_token().never();
        gateway.expect_attach_source().never();

        let mut user_repo = MockUserRepository::new();
        user_repo.expect_link_customer().never();

        let usecase = CustomerProvisioningUseCase::new(Arc::new(user_repo), Arc::new(gateway));
        let err = usecase.provision(sample_model(None)).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::CustomerCreation(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn tokenization_failure_stops_before_attaching() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .times(1)
            .returning(|_| Ok(customer("cus_new")));
        gateway
            .expect_create_card_token()
            .times(1)
            .returning(|_| {
                Err(api_error(
                    "create card token",
                    402,
                    "Your card number is incorrect.",
                ))
            });
        gateway.expect_attach_source().never();

        let mut user_repo = MockUserRepository::new();
        user_repo.expect_link_customer().never();

        let usecase = CustomerProvisioningUseCase::new(Arc::new(user_repo), Arc::new(gateway));
        let err = usecase.provision(sample_model(None)).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::CardTokenization(_)));
        assert_eq!(
            err.to_string(),
            "could not create card token: Stripe API request failed: create card token \
             (status 402): Your card number is incorrect."
        );
    }

    #[tokio::test]
    async fn attach_failure_writes_nothing() {
        let mut gateway = gateway_until_attach();
        gateway
            .expect_attach_source()
            .times(1)
            .returning(|_, _| Err(api_error("attach card source", 400, "token already used")));

        let mut user_repo = MockUserRepository::new();
        user_repo.expect_link_customer().never();

        let usecase = CustomerProvisioningUseCase::new(Arc::new(user_repo), Arc::new(gateway));
        let err = usecase.provision(sample_model(None)).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::SourceAttachment(_)));
    }

    #[tokio::test]
    async fn user_record_failure_is_reported() {
        let mut gateway = gateway_until_attach();
        attach_ok(&mut gateway);

        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_link_customer()
            .times(1)
            .returning(|_, _| Err(anyhow!("connection refused")));

        let usecase = CustomerProvisioningUseCase::new(Arc::new(user_repo), Arc::new(gateway));
        let err = usecase.provision(sample_model(None)).await.unwrap_err();

        assert!(matches!(err, ProvisioningError::UserRecord(_)));
    }
}
