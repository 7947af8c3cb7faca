//! # Envision Node
//!
//! HTTP service that runs qualitative envisioning jobs and serves their
//! state graphs as JSON, Graphviz DOT or a text table.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod api;
mod engine;
mod render;
mod state;

use engine::Engine;
use state::AppState;

/// Default bind address when `ENVISION_ADDR` is not set.
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Run the envisioning node.
pub async fn run_server(addr: SocketAddr) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🚀 Envision Node starting...");

    let state = AppState::new();

    // Jobs run in the background, one at a time
    let engine = Arc::new(Engine::new(state.clone()));
    tokio::spawn(engine.run());

    let app = create_router(state);

    info!("🌐 Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health::health_check))
        // Scenario catalog
        .route("/api/v1/scenarios", get(api::scenarios::list_scenarios))
        .route("/api/v1/scenarios/:name/dot", get(api::scenarios::scenario_dot))
        // Envisioning jobs
        .route("/api/v1/envision", post(api::envision::submit_job))
        .route(
            "/api/v1/envision/:id",
            get(api::envision::get_job).delete(api::envision::cancel_job),
        )
        .route("/api/v1/envision/:id/graph", get(api::envision::get_graph))
        .route("/api/v1/envision/:id/dot", get(api::envision::get_dot))
        .route("/api/v1/envision/:id/table", get(api::envision::get_table))
        .route("/api/v1/envision/:id/path/:state", get(api::envision::get_path))
        .route("/api/v1/jobs", get(api::envision::list_jobs))
        // Synchronous run
        .route("/api/v1/simulate", post(api::simulate::simulate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr: SocketAddr = std::env::var("ENVISION_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    run_server(addr).await
}
