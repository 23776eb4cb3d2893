pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with the webhook routes and middleware.
/// Used by `serve_on()` and by the integration tests.
pub fn build_router(app_state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        tracing::info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %uuid::Uuid::new_v4(),
        )
    });

    Router::new()
        .route("/update-role", post(routes::roles::update_role))
        .route("/remove-role", post(routes::roles::remove_role))
        .route("/health", get(routes::health::health))
        .layer(trace)
        .with_state(app_state)
}

/// Start the webhook server on `port`.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    serve_on(app_state, listener).await
}

/// Start the webhook server on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(app_state);

    tracing::info!("webhook server listening on port {actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
