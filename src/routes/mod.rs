//! Router assembly: API routes, health, the 404 fallback, CORS, compression,
//! body limit and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::Uri,
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{instrument, Level};

use crate::error::AppError;
use crate::protocol::HealthOut;
use crate::state::AppState;

pub mod ai;
pub mod problems;
pub mod users;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with:
/// - `/api/users`, `/api/problems`, `/api/ai`
/// - `/health`
/// - an envelope 404 for anything else
/// - CORS (allow any origin/method/headers)
/// - gzip, a 10 MB request body cap (enveloped 400 on overflow), and
///   per-request trace spans
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/users", users::router())
        .nest("/api/problems", problems::router())
        .nest("/api/ai", ai::router())
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(CompressionLayer::new()),
        )
}

#[instrument(level = "debug", skip(state))]
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "OK".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Not found - {}", uri.path()))
}
