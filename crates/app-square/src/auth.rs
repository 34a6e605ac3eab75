//! Admin token checks for privileged routes.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::AdminConfig;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Operator name recorded in audit logs for authenticated admin calls.
pub const ADMIN_OPERATOR: &str = "admin";

/// Holds the configured admin token. Without one, every admin check fails.
#[derive(Clone, Default)]
pub struct AdminGuard {
    token: Option<Arc<str>>,
}

impl std::fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGuard")
            .field("configured", &self.token.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("admin token missing")]
    Missing,
    #[error("admin token invalid")]
    Invalid,
    #[error("admin access is not configured")]
    NotConfigured,
}

impl AdminGuard {
    pub fn new(config: &AdminConfig) -> Self {
        Self {
            token: config.token.as_deref().map(Arc::from),
        }
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Some(Arc::from(token)),
        }
    }

    /// Accepts `Authorization: Bearer <token>` or `X-Admin-Token: <token>`.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let Some(expected) = self.token.as_deref() else {
            return Err(AuthError::NotConfigured);
        };

        let presented = bearer_token(headers).or_else(|| {
            headers
                .get(ADMIN_TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        });

        match presented {
            None | Some("") => Err(AuthError::Missing),
            Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
            Some(_) => Err(AuthError::Invalid),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.to_string() });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    }
}

/// Extractor proving the request carried a valid admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminAccess
where
    AdminGuard: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = AdminGuard::from_ref(state);
        guard.verify(&parts.headers).inspect_err(|err| {
            tracing::warn!(path = %parts.uri.path(), error = %err, "admin request rejected");
        })?;
        Ok(AdminAccess)
    }
}
