use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::headers::no_store;
use super::AppState;
use crate::db;
use crate::metrics::CONTENT_TYPE as METRICS_CONTENT_TYPE;

/// `ok` when the database answers (or none is configured), `degraded` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let healthy = match &state.pool {
        Some(pool) => db::ping(pool).await,
        None => true,
    };

    if healthy {
        no_store((StatusCode::OK, "ok"))
    } else {
        tracing::warn!("Health check failed: database did not answer");
        no_store((StatusCode::SERVICE_UNAVAILABLE, "degraded"))
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            tracing::error!("Failed to render metrics: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics error").into_response()
        }
    }
}
