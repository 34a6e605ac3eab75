use crate::config::ConfigError;
use crate::directory::DirectoryServiceError;
use crate::ranking::RankingServiceError;
use crate::repository::RepositoryError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Process-level error surfaced by the binary's entry points.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Storage(RepositoryError),
    Ranking(RankingServiceError),
    Directory(DirectoryServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Storage(err) => write!(f, "storage error: {}", err),
            AppError::Ranking(err) => write!(f, "ranking error: {}", err),
            AppError::Directory(err) => write!(f, "directory error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Ranking(err) => Some(err),
            AppError::Directory(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Ranking(RankingServiceError::Validation(_))
            | AppError::Directory(DirectoryServiceError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Ranking(RankingServiceError::NotFound(_))
            | AppError::Directory(DirectoryServiceError::NotFound(_))
            | AppError::Storage(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Ranking(RankingServiceError::Conflict(_))
            | AppError::Ranking(RankingServiceError::SyncInProgress(_))
            | AppError::Directory(DirectoryServiceError::Conflict(_))
            | AppError::Storage(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Storage(value)
    }
}

impl From<RankingServiceError> for AppError {
    fn from(value: RankingServiceError) -> Self {
        Self::Ranking(value)
    }
}

impl From<DirectoryServiceError> for AppError {
    fn from(value: DirectoryServiceError) -> Self {
        Self::Directory(value)
    }
}
