//! Patient record HTTP surface.
//!
//! | Method | Path             | Success                   |
//! |--------|------------------|---------------------------|
//! | GET    | `/patients`      | 200, array of records     |
//! | GET    | `/patients/:id`  | 200, record               |
//! | POST   | `/patients`      | 201, created record       |
//! | PUT    | `/patients/:id`  | 200, updated record       |
//! | DELETE | `/patients/:id`  | 200, confirmation message |
//!
//! Failures carry a JSON body with an `error` key.

mod error;
mod handlers;

pub use error::{ApiError, ApiResult};

use std::future::Future;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use hospital_records_core::PatientRecords;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub records: PatientRecords,
}

impl AppState {
    pub fn new(records: PatientRecords) -> Self {
        Self { records }
    }
}

/// Build the router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route(
            "/patients/:id",
            get(handlers::get_patient)
                .put(handlers::update_patient)
                .delete(handlers::delete_patient),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!(%addr, "record service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}
