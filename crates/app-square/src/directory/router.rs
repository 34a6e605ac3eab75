use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    AppFilter, AppId, AppStatus, DataLevel, EffectivenessType, RankingParamsUpdate, Section,
    SubmissionDraft, SubmissionId, SubmissionStatus, METRIC_TYPES,
};
use super::repository::{DirectoryRepository, RepositoryError};
use super::service::{DirectoryService, DirectoryServiceError};
use crate::auth::{AdminAccess, AdminGuard};
use crate::http::{internal_error, run_blocking};
use crate::validation::ValidationError;

/// Shared state for directory handlers.
pub struct DirectoryState<D> {
    pub service: Arc<DirectoryService<D>>,
    pub admin: AdminGuard,
}

impl<D> Clone for DirectoryState<D> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            admin: self.admin.clone(),
        }
    }
}

impl<D> FromRef<DirectoryState<D>> for AdminGuard {
    fn from_ref(state: &DirectoryState<D>) -> Self {
        state.admin.clone()
    }
}

/// Router builder for the application directory and submission review.
pub fn directory_router<D>(service: Arc<DirectoryService<D>>, admin: AdminGuard) -> Router
where
    D: DirectoryRepository + 'static,
{
    Router::new()
        .route("/apps", get(list_apps_handler::<D>))
        .route("/apps/ranking-params", put(ranking_params_handler::<D>))
        .route("/apps/:app_id", get(get_app_handler::<D>))
        .route("/meta/enums", get(enums_handler))
        .route("/stats", get(stats_handler::<D>))
        .route("/recommendations", get(recommendations_handler::<D>))
        .route("/rules", get(rules_handler::<D>))
        .route(
            "/submissions",
            get(list_submissions_handler::<D>).post(create_submission_handler::<D>),
        )
        .route("/submissions/:submission_id", get(get_submission_handler::<D>))
        .route(
            "/submissions/:submission_id/approve-and-create-app",
            post(approve_handler::<D>),
        )
        .route("/submissions/:submission_id/reject", post(reject_handler::<D>))
        .with_state(DirectoryState { service, admin })
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AppListParams {
    section: Option<String>,
    status: Option<String>,
    category: Option<String>,
    q: Option<String>,
}

impl AppListParams {
    fn into_filter(self) -> Result<AppFilter, ValidationError> {
        let section = parse_optional::<Section>("section", self.section)?;
        let status = parse_optional::<AppStatus>("status", self.status)?;
        Ok(AppFilter {
            section,
            status,
            category: self.category,
            query: self.q,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmissionListParams {
    status: Option<String>,
}

fn parse_optional<T>(field: &'static str, value: Option<String>) -> Result<Option<T>, ValidationError>
where
    T: std::str::FromStr<Err = super::domain::UnknownVariant>,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| ValidationError::new(field, format!("must be one of: {}", err.expected))),
    }
}

pub(crate) async fn list_apps_handler<D>(
    State(state): State<DirectoryState<D>>,
    Query(params): Query<AppListParams>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    let filter = match params.into_filter() {
        Ok(filter) => filter,
        Err(err) => return error_response(err.into()),
    };
    match run_blocking(
        &state.service,
        move |service| service.list_apps(filter),
        error_response,
    )
    .await
    {
        Ok(apps) => (StatusCode::OK, axum::Json(apps)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn get_app_handler<D>(
    State(state): State<DirectoryState<D>>,
    Path(app_id): Path<i64>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.get_app(AppId(app_id)),
        error_response,
    )
    .await
    {
        Ok(app) => (StatusCode::OK, axum::Json(app)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn ranking_params_handler<D>(
    _admin: AdminAccess,
    State(state): State<DirectoryState<D>>,
    axum::Json(update): axum::Json<RankingParamsUpdate>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.update_ranking_params(update),
        error_response,
    )
    .await
    {
        Ok(updated) => {
            let payload = json!({
                "message": "ranking parameters updated",
                "updated_count": updated,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn enums_handler() -> Response {
    let payload = json!({
        "app_status": AppStatus::ALL.map(AppStatus::label),
        "metric_types": METRIC_TYPES,
        "value_dimensions": EffectivenessType::ALL.map(EffectivenessType::label),
        "data_levels": DataLevel::ALL.map(DataLevel::label),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn stats_handler<D>(State(state): State<DirectoryState<D>>) -> Response
where
    D: DirectoryRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.stats(),
        error_response,
    )
    .await
    {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn recommendations_handler<D>(State(state): State<DirectoryState<D>>) -> Response
where
    D: DirectoryRepository + 'static,
{
    (StatusCode::OK, axum::Json(state.service.recommendations())).into_response()
}

pub(crate) async fn rules_handler<D>(State(state): State<DirectoryState<D>>) -> Response
where
    D: DirectoryRepository + 'static,
{
    (StatusCode::OK, axum::Json(state.service.rules())).into_response()
}

pub(crate) async fn create_submission_handler<D>(
    State(state): State<DirectoryState<D>>,
    axum::Json(draft): axum::Json<SubmissionDraft>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.create_submission(draft),
        error_response,
    )
    .await
    {
        Ok(submission) => (StatusCode::CREATED, axum::Json(submission)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn list_submissions_handler<D>(
    State(state): State<DirectoryState<D>>,
    Query(params): Query<SubmissionListParams>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    let status = match parse_optional::<SubmissionStatus>("status", params.status) {
        Ok(status) => status,
        Err(err) => return error_response(err.into()),
    };
    match run_blocking(
        &state.service,
        move |service| service.list_submissions(status),
        error_response,
    )
    .await
    {
        Ok(submissions) => (StatusCode::OK, axum::Json(submissions)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn get_submission_handler<D>(
    State(state): State<DirectoryState<D>>,
    Path(submission_id): Path<i64>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.get_submission(SubmissionId(submission_id)),
        error_response,
    )
    .await
    {
        Ok(submission) => (StatusCode::OK, axum::Json(submission)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn approve_handler<D>(
    _admin: AdminAccess,
    State(state): State<DirectoryState<D>>,
    Path(submission_id): Path<i64>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.approve_submission(SubmissionId(submission_id), None),
        error_response,
    )
    .await
    {
        Ok(approval) => (StatusCode::CREATED, axum::Json(approval)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn reject_handler<D>(
    _admin: AdminAccess,
    State(state): State<DirectoryState<D>>,
    Path(submission_id): Path<i64>,
) -> Response
where
    D: DirectoryRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.reject_submission(SubmissionId(submission_id)),
        error_response,
    )
    .await
    {
        Ok(submission) => (StatusCode::OK, axum::Json(submission)).into_response(),
        Err(response) => response,
    }
}

fn error_response(err: DirectoryServiceError) -> Response {
    let status = match &err {
        DirectoryServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DirectoryServiceError::NotFound(_)
        | DirectoryServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        DirectoryServiceError::Conflict(_)
        | DirectoryServiceError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        DirectoryServiceError::Repository(RepositoryError::Unavailable(_)) => {
            error!(error = %err, "directory request failed");
            return internal_error();
        }
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
