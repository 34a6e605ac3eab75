use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{
    DimensionDraft, DimensionId, DimensionPatch, ParticipationDraft, ParticipationPatch,
    RankingConfigDraft, RankingConfigPatch, SettingId,
};
use super::repository::{RankingRepository, RepositoryError};
use super::service::{LeaderboardQuery, RankingService, RankingServiceError, SyncRequest};
use crate::auth::{AdminAccess, AdminGuard, ADMIN_OPERATOR};
use crate::directory::domain::AppId;
use crate::http::{internal_error, run_blocking};
use crate::validation::ValidationError;

/// Shared state for ranking handlers.
pub struct RankingState<R> {
    pub service: Arc<RankingService<R>>,
    pub admin: AdminGuard,
}

impl<R> Clone for RankingState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            admin: self.admin.clone(),
        }
    }
}

impl<R> FromRef<RankingState<R>> for AdminGuard {
    fn from_ref(state: &RankingState<R>) -> Self {
        state.admin.clone()
    }
}

/// Router builder exposing leaderboards, synchronization and the ranking registries.
pub fn ranking_router<R>(service: Arc<RankingService<R>>, admin: AdminGuard) -> Router
where
    R: RankingRepository + 'static,
{
    Router::new()
        .route("/rankings", get(leaderboard_handler::<R>))
        .route("/rankings/historical", get(historical_handler::<R>))
        .route("/rankings/historical/dates", get(period_dates_handler::<R>))
        .route("/rankings/sync", post(sync_handler::<R>))
        .route(
            "/ranking-dimensions",
            get(list_dimensions_handler::<R>).post(create_dimension_handler::<R>),
        )
        .route(
            "/ranking-dimensions/:dimension_id",
            get(get_dimension_handler::<R>)
                .put(update_dimension_handler::<R>)
                .delete(delete_dimension_handler::<R>),
        )
        .route(
            "/ranking-dimensions/:dimension_id/scores",
            get(dimension_scores_handler::<R>),
        )
        .route("/ranking-logs", get(logs_handler::<R>))
        .route(
            "/ranking-configs",
            get(list_configs_handler::<R>).post(create_config_handler::<R>),
        )
        .route(
            "/ranking-configs/:config_id",
            get(get_config_handler::<R>)
                .put(update_config_handler::<R>)
                .delete(delete_config_handler::<R>),
        )
        .route(
            "/apps/:app_id/ranking-settings",
            get(list_settings_handler::<R>).post(create_setting_handler::<R>),
        )
        .route(
            "/apps/:app_id/ranking-settings/:setting_id",
            get(get_setting_handler::<R>)
                .put(update_setting_handler::<R>)
                .delete(delete_setting_handler::<R>),
        )
        .with_state(RankingState { service, admin })
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeaderboardParams {
    #[serde(default)]
    ranking_type: String,
    period_date: Option<String>,
    run_id: Option<String>,
}

impl TryFrom<LeaderboardParams> for LeaderboardQuery {
    type Error = ValidationError;

    fn try_from(params: LeaderboardParams) -> Result<Self, Self::Error> {
        Ok(LeaderboardQuery {
            ranking_type: params.ranking_type,
            period_date: parse_period_date(params.period_date)?,
            run_id: non_blank(params.run_id),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Blank means "not given"; anything else must be `YYYY-MM-DD`.
fn parse_period_date(value: Option<String>) -> Result<Option<NaiveDate>, ValidationError> {
    non_blank(value)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .map_err(|_| ValidationError::new("period_date", "must be a YYYY-MM-DD date"))
        })
        .transpose()
}

#[derive(Debug, Deserialize)]
pub(crate) struct RankingTypeParams {
    #[serde(default)]
    ranking_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SyncParams {
    ranking_config_id: Option<String>,
    run_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActiveParams {
    #[serde(default)]
    active_only: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LogParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreParams {
    period_date: Option<String>,
}

pub(crate) async fn leaderboard_handler<R>(
    State(state): State<RankingState<R>>,
    Query(params): Query<LeaderboardParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    let query = match LeaderboardQuery::try_from(params) {
        Ok(query) => query,
        Err(err) => return error_response(err.into()),
    };
    match run_blocking(
        &state.service,
        move |service| service.leaderboard(query),
        error_response,
    )
    .await
    {
        Ok(board) => (StatusCode::OK, axum::Json(board)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn historical_handler<R>(
    State(state): State<RankingState<R>>,
    Query(params): Query<LeaderboardParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    let query = match LeaderboardQuery::try_from(params) {
        Ok(query) => query,
        Err(err) => return error_response(err.into()),
    };
    match run_blocking(
        &state.service,
        move |service| service.historical(query),
        error_response,
    )
    .await
    {
        Ok(board) => (StatusCode::OK, axum::Json(board)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn period_dates_handler<R>(
    State(state): State<RankingState<R>>,
    Query(params): Query<RankingTypeParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.period_dates(params.ranking_type),
        error_response,
    )
    .await
    {
        Ok(dates) => (StatusCode::OK, axum::Json(dates)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn sync_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Query(params): Query<SyncParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    let request = SyncRequest {
        ranking_config_id: params.ranking_config_id.filter(|id| !id.trim().is_empty()),
        run_id: params.run_id.filter(|id| !id.trim().is_empty()),
        today: None,
    };
    let outcome =
        run_blocking(&state.service, move |service| service.synchronize(request), error_response)
            .await;

    match outcome {
        Ok(report) => {
            let payload = json!({
                "message": format!(
                    "synchronized {} ranking config(s)",
                    report.config_ids.len()
                ),
                "updated_count": report.updated_count,
                "run_id": report.run_id,
                "period_date": report.period_date,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn list_dimensions_handler<R>(
    State(state): State<RankingState<R>>,
    Query(params): Query<ActiveParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.list_dimensions(params.active_only),
        error_response,
    )
    .await
    {
        Ok(dimensions) => (StatusCode::OK, axum::Json(dimensions)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn get_dimension_handler<R>(
    State(state): State<RankingState<R>>,
    Path(dimension_id): Path<i64>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.get_dimension(DimensionId(dimension_id)),
        error_response,
    )
    .await
    {
        Ok(dimension) => (StatusCode::OK, axum::Json(dimension)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn create_dimension_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    axum::Json(draft): axum::Json<DimensionDraft>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.create_dimension(draft, ADMIN_OPERATOR),
        error_response,
    )
    .await
    {
        Ok(dimension) => (StatusCode::CREATED, axum::Json(dimension)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn update_dimension_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Path(dimension_id): Path<i64>,
    axum::Json(patch): axum::Json<DimensionPatch>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| {
            service.update_dimension(DimensionId(dimension_id), patch, ADMIN_OPERATOR)
        },
        error_response,
    )
    .await
    {
        Ok(dimension) => (StatusCode::OK, axum::Json(dimension)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn delete_dimension_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Path(dimension_id): Path<i64>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.delete_dimension(DimensionId(dimension_id), ADMIN_OPERATOR),
        error_response,
    )
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn dimension_scores_handler<R>(
    State(state): State<RankingState<R>>,
    Path(dimension_id): Path<i64>,
    Query(params): Query<ScoreParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    let period_date = match parse_period_date(params.period_date) {
        Ok(date) => date,
        Err(err) => return error_response(err.into()),
    };
    match run_blocking(
        &state.service,
        move |service| service.dimension_scores(DimensionId(dimension_id), period_date),
        error_response,
    )
    .await
    {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn logs_handler<R>(
    State(state): State<RankingState<R>>,
    Query(params): Query<LogParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.list_logs(params.limit),
        error_response,
    )
    .await
    {
        Ok(logs) => (StatusCode::OK, axum::Json(logs)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn list_configs_handler<R>(
    State(state): State<RankingState<R>>,
    Query(params): Query<ActiveParams>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.list_configs(params.active_only),
        error_response,
    )
    .await
    {
        Ok(configs) => (StatusCode::OK, axum::Json(configs)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn get_config_handler<R>(
    State(state): State<RankingState<R>>,
    Path(config_id): Path<String>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.get_config(&config_id),
        error_response,
    )
    .await
    {
        Ok(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn create_config_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    axum::Json(draft): axum::Json<RankingConfigDraft>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.create_config(draft),
        error_response,
    )
    .await
    {
        Ok(config) => (StatusCode::CREATED, axum::Json(config)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn update_config_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Path(config_id): Path<String>,
    axum::Json(patch): axum::Json<RankingConfigPatch>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.update_config(&config_id, patch),
        error_response,
    )
    .await
    {
        Ok(config) => (StatusCode::OK, axum::Json(config)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn delete_config_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Path(config_id): Path<String>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.delete_config(&config_id),
        error_response,
    )
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn list_settings_handler<R>(
    State(state): State<RankingState<R>>,
    Path(app_id): Path<i64>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.list_settings(AppId(app_id)),
        error_response,
    )
    .await
    {
        Ok(settings) => (StatusCode::OK, axum::Json(settings)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn get_setting_handler<R>(
    State(state): State<RankingState<R>>,
    Path((app_id, setting_id)): Path<(i64, i64)>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.get_setting(AppId(app_id), SettingId(setting_id)),
        error_response,
    )
    .await
    {
        Ok(setting) => (StatusCode::OK, axum::Json(setting)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn create_setting_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Path(app_id): Path<i64>,
    axum::Json(draft): axum::Json<ParticipationDraft>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.create_setting(AppId(app_id), draft),
        error_response,
    )
    .await
    {
        Ok(setting) => (StatusCode::CREATED, axum::Json(setting)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn update_setting_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Path((app_id, setting_id)): Path<(i64, i64)>,
    axum::Json(patch): axum::Json<ParticipationPatch>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.update_setting(AppId(app_id), SettingId(setting_id), patch),
        error_response,
    )
    .await
    {
        Ok(setting) => (StatusCode::OK, axum::Json(setting)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn delete_setting_handler<R>(
    _admin: AdminAccess,
    State(state): State<RankingState<R>>,
    Path((app_id, setting_id)): Path<(i64, i64)>,
) -> Response
where
    R: RankingRepository + 'static,
{
    match run_blocking(
        &state.service,
        move |service| service.delete_setting(AppId(app_id), SettingId(setting_id)),
        error_response,
    )
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

fn error_response(err: RankingServiceError) -> Response {
    let status = match &err {
        RankingServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RankingServiceError::NotFound(_)
        | RankingServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        RankingServiceError::Conflict(_)
        | RankingServiceError::SyncInProgress(_)
        | RankingServiceError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        RankingServiceError::Repository(RepositoryError::Unavailable(_)) => {
            error!(error = %err, "ranking request failed");
            return internal_error();
        }
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

