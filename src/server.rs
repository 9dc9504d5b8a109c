//! HTTP boundary: `POST /api/transform` in front of a shared [`Restyler`].
//!
//! The handler reads the raw body itself instead of using `Json<T>` so that
//! a missing or non-string `imageBase64`, a malformed body and an oversized
//! body are all answered with our own `{ "error": … }` envelope rather than
//! axum's plain-text rejection.

use crate::error::RestyleError;
use crate::output::ErrorResponse;
use crate::transform::Restyler;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Default request body limit: 20 MiB of base64.
pub const DEFAULT_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Shared handler state.
pub type AppState = Arc<Restyler>;

/// Build the application router.
pub fn router(restyler: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/api/transform", post(transform))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(restyler)
}

/// Bind `addr` and serve `app` until Ctrl-C.
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn transform(
    State(restyler): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(b) => b,
        Err(rejection) => {
            warn!("Rejected transform request body: {}", rejection.body_text());
            return RestyleError::BodyRejected {
                status: rejection.status().as_u16(),
                message: rejection.body_text(),
            }
            .into_response();
        }
    };

    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!("Rejected transform request with invalid JSON: {}", e);
            return RestyleError::Validation(format!("Request body is not valid JSON: {e}"))
                .into_response();
        }
    };

    match restyler.run_json(&value).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for RestyleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_upstream() {
            warn!("Transform failed upstream, answering {}: {}", status, self);
        } else if status.is_server_error() {
            error!("Transform failed with {}: {}", status, self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
