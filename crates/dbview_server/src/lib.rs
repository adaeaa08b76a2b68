//! HTTP front door for dbview.
//!
//! # Responsibility
//! - Route read-only `/view/*` requests to the fetch service.
//! - Serialize results as JSON; map failures to 500 with a fixed message.
//!
//! # Invariants
//! - Response bodies never carry store error details; those go to logs.
//! - Blocking document-store work runs off the async worker threads.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use dbview_core::{core_version, DocumentStore, FetchError, FetchService, RelationalStore};
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;

/// Shared handle every route works through.
pub type SharedFetchService<D, R> = Arc<FetchService<D, R>>;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Builds the router over an already-connected fetch service.
pub fn build_router<D, R>(service: SharedFetchService<D, R>) -> Router
where
    D: DocumentStore + Send + Sync + 'static,
    R: RelationalStore + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/view/events", get(view_events::<D, R>))
        .route("/view/accounts", get(view_accounts::<D, R>))
        .route("/view/postgres-data", get(view_postgres_data::<D, R>))
        .with_state(service)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: core_version(),
    })
}

async fn view_events<D, R>(State(service): State<SharedFetchService<D, R>>) -> Response
where
    D: DocumentStore + Send + Sync + 'static,
    R: RelationalStore + Send + Sync + 'static,
{
    info!("event=http_request module=http route=/view/events");
    let outcome = tokio::task::spawn_blocking(move || service.fetch_events()).await;
    respond_blocking("/view/events", "events", outcome)
}

async fn view_accounts<D, R>(State(service): State<SharedFetchService<D, R>>) -> Response
where
    D: DocumentStore + Send + Sync + 'static,
    R: RelationalStore + Send + Sync + 'static,
{
    info!("event=http_request module=http route=/view/accounts");
    let outcome = tokio::task::spawn_blocking(move || service.fetch_accounts()).await;
    respond_blocking("/view/accounts", "accounts", outcome)
}

async fn view_postgres_data<D, R>(State(service): State<SharedFetchService<D, R>>) -> Response
where
    D: DocumentStore + Send + Sync + 'static,
    R: RelationalStore + Send + Sync + 'static,
{
    info!("event=http_request module=http route=/view/postgres-data");
    respond("/view/postgres-data", service.fetch_relational_bundle().await)
}

fn respond<T: Serialize>(route: &str, outcome: Result<T, FetchError>) -> Response {
    match outcome {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => {
            error!(
                "event=http_response module=http status=error route={route} code=500 error_code={} error={err}",
                err.source.kind()
            );
            (StatusCode::INTERNAL_SERVER_ERROR, err.public_message()).into_response()
        }
    }
}

fn respond_blocking<T: Serialize>(
    route: &str,
    target: &str,
    outcome: Result<Result<T, FetchError>, tokio::task::JoinError>,
) -> Response {
    match outcome {
        Ok(result) => respond(route, result),
        Err(join_err) => {
            error!(
                "event=http_response module=http status=error route={route} code=500 error_code=worker_failed error={join_err}"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch {target}"),
            )
                .into_response()
        }
    }
}
