use crate::{
    axum_http::default_routers::StatusBody,
    usecases::customer_provisioning::{CustomerProvisioningUseCase, ProvisioningError},
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::any,
};
use crates::{
    domain::{
        repositories::users::UserRepository,
        value_objects::provisioning::ProvisionCustomerQuery,
    },
    infra::db::{postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
    payments::{gateway::PaymentGateway, stripe_client::StripeClient},
};
use std::sync::Arc;
use tracing::{info, warn};

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let usecase = CustomerProvisioningUseCase::new(Arc::new(user_repository), stripe_client);

    Router::new()
        .route("/", any(provision_customer::<UserPostgres, StripeClient>))
        .with_state(Arc::new(usecase))
}

/// Answers 200 whatever happens; the outcome is carried in the body.
pub async fn provision_customer<U, G>(
    State(usecase): State<Arc<CustomerProvisioningUseCase<U, G>>>,
    Query(query): Query<ProvisionCustomerQuery>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    info!(user = ?query.user, "customers: provisioning request received");

    let result = match query.into_model() {
        Ok(model) => usecase.provision(model).await.map(|_| ()),
        Err(err) => Err(ProvisioningError::from(err)),
    };

    let body = match result {
        Ok(()) => StatusBody::success(),
        Err(err) => {
            warn!(error = %err, "customers: provisioning failed");
            StatusBody::error(err.to_string())
        }
    };

    (StatusCode::OK, Json(body)).into_response()
}
