//! Helpers shared by the directory and ranking routers.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

/// Runs a service call on the blocking pool; the SQLite store holds a lock for its duration.
pub(crate) async fn run_blocking<S, T, E, F, O>(
    service: &Arc<S>,
    work: F,
    on_error: O,
) -> Result<T, Response>
where
    S: Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce(&S) -> Result<T, E> + Send + 'static,
    O: FnOnce(E) -> Response,
{
    let service = Arc::clone(service);
    match tokio::task::spawn_blocking(move || work(&service)).await {
        Ok(result) => result.map_err(on_error),
        Err(join_error) => {
            error!(error = %join_error, "request task aborted");
            Err(internal_error())
        }
    }
}

pub(crate) fn internal_error() -> Response {
    let payload = json!({
        "error": "internal server error",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
