use crate::runner::{RunTrigger, TriggerSource};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use inbot_engine::error::InboxError;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

pub fn router(trigger: Arc<dyn RunTrigger>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/linkedin", post(start_run))
        .with_state(trigger)
}

pub async fn serve(
    port: u16,
    trigger: Arc<dyn RunTrigger>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(trigger))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "Server running...")
}

async fn start_run(State(trigger): State<Arc<dyn RunTrigger>>) -> impl IntoResponse {
    match trigger.trigger(TriggerSource::Http) {
        Ok(()) => (StatusCode::OK, "LinkedIn service running...".to_string()),
        Err(InboxError::AlreadyRunning) => {
            warn!("Rejected run request: a run is already in progress");
            (
                StatusCode::CONFLICT,
                "A run is already in progress".to_string(),
            )
        }
        Err(err) => {
            error!("Could not start run: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
