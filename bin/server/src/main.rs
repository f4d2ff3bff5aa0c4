//! HTTP front door for the callflow workflow engine.

mod config;
mod routes;

use crate::config::ServerConfig;
use crate::routes::AppState;
use callflow_engine::PipelineRunner;
use callflow_services::ServiceClient;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    let client = Arc::new(
        ServiceClient::new(config.services).expect("failed to build the service client"),
    );
    let registry = Arc::new(
        callflow_nodes::bootstrap::default_registry(client)
            .expect("failed to initialize the registry"),
    );
    let app_state = Arc::new(AppState {
        registry: Arc::clone(&registry),
        runner: PipelineRunner::new(registry),
    });

    let app = routes::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server error");
}
