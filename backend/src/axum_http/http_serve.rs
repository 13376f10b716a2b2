use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{Router, routing::get};
use crates::{
    infra::db::postgres::postgres_connection::PgPoolSquad, payments::stripe_client::StripeClient,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

pub async fn start(
    config: Arc<DotEnvyConfig>,
    db_pool: Arc<PgPoolSquad>,
    stripe_client: Arc<StripeClient>,
) -> Result<()> {
    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/customers",
            routers::customers::routes(Arc::clone(&db_pool), Arc::clone(&stripe_client)),
        )
        .nest(
            "/api/v1/payments",
            routers::payments::routes(Arc::clone(&db_pool)),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received ctrl+C signal"),
        Err(err) => {
            warn!(error = %err, "Failed to listen for ctrl+C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
