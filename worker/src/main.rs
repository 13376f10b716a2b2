use anyhow::Result;
use crates::{
    infra::db::{
        postgres::postgres_connection,
        repositories::{document_events::DocumentEventPostgres, payments::PaymentDocumentPostgres},
    },
    payments::stripe_client::StripeClient,
};
use std::sync::Arc;
use tracing::{error, info};
use worker::{
    axum_http, config, services::payment_events_loop::PaymentEventsLoop,
    usecases::charge_workflow::ChargeWorkflowUseCase,
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");
    let db_pool_arc = Arc::new(postgres_pool);

    let stripe_client = Arc::new(StripeClient::new(
        dotenvy_env.stripe.secret_key.clone(),
        &dotenvy_env.stripe.api_base,
    )?);

    let payment_repository = Arc::new(PaymentDocumentPostgres::new(Arc::clone(&db_pool_arc)));
    let event_repository = Arc::new(DocumentEventPostgres::new(
        Arc::clone(&db_pool_arc),
        dotenvy_env.charge.event_lease(),
    ));

    let charge_workflow = Arc::new(ChargeWorkflowUseCase::new(
        Arc::clone(&payment_repository),
        stripe_client,
        dotenvy_env.charge.currency.clone(),
    ));
    info!(currency = %dotenvy_env.charge.currency, "Charge workflow is ready");

    let payment_events_loop = tokio::spawn(
        PaymentEventsLoop::new(
            event_repository,
            payment_repository,
            charge_workflow,
            dotenvy_env.charge.poll_interval(),
            dotenvy_env.charge.max_attempts,
        )
        .run(),
    );

    let server_config = Arc::clone(&dotenvy_env);
    let health_server = tokio::spawn(async move { axum_http::http_serve::start(server_config).await });

    tokio::select! {
        result = payment_events_loop => result??,
        result = health_server => result??,
    };
    Ok(())
}
