use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::review::{self, EdgeReviewer, routes::ReviewState};

/// Review API with request tracing and a per-request timeout.
pub fn build_app(state: ReviewState, request_timeout: Duration) -> Router {
    review::build_router()
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(request_timeout, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the classified output and serve it until the process is stopped.
pub async fn start_server(config: &AppConfig) -> anyhow::Result<()> {
    let reviewer = EdgeReviewer::load(&config.pipeline.output_dir).await?;
    let state: ReviewState = Arc::new(RwLock::new(reviewer));
    let app = build_app(state, config.review.request_timeout());

    let addr = format!("{}:{}", config.review.host, config.review.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        output_dir = %config.pipeline.output_dir.display(),
        "Review server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
