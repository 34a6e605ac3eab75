use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::audit;
use super::domain::{
    Dimension, DimensionDraft, DimensionId, DimensionPatch, DimensionScoreEntry, HistoricalEntry,
    ParticipationDraft, ParticipationPatch, ParticipationSetting, RankingConfig,
    RankingConfigDraft, RankingConfigPatch, RankingEntry, RankingLog, RunContext, SettingId,
    SyncReport, SyncScope,
};
use super::repository::{RankingRepository, RepositoryError, RunSelector};
use super::sync::{self, SyncBusy, SyncGuard};
use crate::directory::domain::AppId;
use crate::validation::{
    require_length, require_max_length, require_non_negative, require_weight, ValidationError,
    MAX_TAG_CHARS,
};

const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 500;
const MAX_RUN_ID_CHARS: usize = 64;

/// Parameters of one synchronization request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncRequest {
    pub ranking_config_id: Option<String>,
    pub run_id: Option<String>,
    /// Snapshot date; defaults to the local calendar date.
    pub today: Option<NaiveDate>,
}

/// Leaderboard read parameters; `ranking_type` is a config id.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardQuery {
    pub ranking_type: String,
    pub period_date: Option<NaiveDate>,
    pub run_id: Option<String>,
}

/// Either the live table or a resolved historical snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Leaderboard {
    Current {
        ranking_type: String,
        entries: Vec<RankingEntry>,
    },
    Historical {
        ranking_type: String,
        period_date: Option<NaiveDate>,
        run_id: Option<String>,
        entries: Vec<HistoricalEntry>,
    },
}

impl Leaderboard {
    pub fn len(&self) -> usize {
        match self {
            Leaderboard::Current { entries, .. } => entries.len(),
            Leaderboard::Historical { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scores recorded for one dimension on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScoreReport {
    pub dimension: Dimension,
    pub period_date: Option<NaiveDate>,
    pub scores: Vec<DimensionScoreEntry>,
}

/// Ranking engine facade: catalog, registries, synchronizer and leaderboard reads.
pub struct RankingService<R> {
    repository: Arc<R>,
    guard: SyncGuard,
}

impl<R> RankingService<R>
where
    R: RankingRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            guard: SyncGuard::new(),
        }
    }

    pub fn list_dimensions(&self, active_only: bool) -> Result<Vec<Dimension>, RankingServiceError> {
        Ok(self.repository.list_dimensions(active_only)?)
    }

    pub fn get_dimension(&self, id: DimensionId) -> Result<Dimension, RankingServiceError> {
        self.repository
            .fetch_dimension(id)?
            .ok_or_else(|| RankingServiceError::not_found("dimension", id))
    }

    pub fn create_dimension(
        &self,
        mut draft: DimensionDraft,
        operator: &str,
    ) -> Result<Dimension, RankingServiceError> {
        draft.name = draft.name.trim().to_string();
        validate_dimension(&draft.name, draft.weight)?;

        let entry = audit::creation(&draft, operator);
        let dimension = self
            .repository
            .insert_dimension(&draft, &entry)
            .map_err(|err| duplicate_name(err, &draft.name))?;
        info!(dimension_id = dimension.id.0, name = %dimension.name, "dimension created");
        Ok(dimension)
    }

    pub fn update_dimension(
        &self,
        id: DimensionId,
        patch: DimensionPatch,
        operator: &str,
    ) -> Result<Dimension, RankingServiceError> {
        let before = self.get_dimension(id)?;
        let mut after = before.clone();
        if let Some(name) = patch.name {
            after.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            after.description = description;
        }
        if let Some(method) = patch.calculation_method {
            after.calculation_method = method;
        }
        if let Some(weight) = patch.weight {
            after.weight = weight;
        }
        if let Some(active) = patch.is_active {
            after.is_active = active;
        }
        validate_dimension(&after.name, after.weight)?;

        let entry = audit::update(&before, &after, operator);
        let updated = self
            .repository
            .update_dimension(&after, &entry)
            .map_err(|err| duplicate_name(err, &after.name))?;
        info!(dimension_id = id.0, changes = %entry.changes, "dimension updated");
        Ok(updated)
    }

    pub fn delete_dimension(&self, id: DimensionId, operator: &str) -> Result<(), RankingServiceError> {
        let dimension = self.get_dimension(id)?;
        let entry = audit::deletion(&dimension, operator);
        self.repository.delete_dimension(id, &entry)?;
        info!(dimension_id = id.0, name = %dimension.name, "dimension deleted");
        Ok(())
    }

    pub fn list_logs(&self, limit: Option<usize>) -> Result<Vec<RankingLog>, RankingServiceError> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
        Ok(self.repository.list_logs(limit)?)
    }

    pub fn list_configs(&self, active_only: bool) -> Result<Vec<RankingConfig>, RankingServiceError> {
        Ok(self.repository.list_configs(active_only)?)
    }

    pub fn get_config(&self, id: &str) -> Result<RankingConfig, RankingServiceError> {
        self.repository
            .fetch_config(id)?
            .ok_or_else(|| RankingServiceError::not_found("ranking config", id))
    }

    pub fn create_config(
        &self,
        mut draft: RankingConfigDraft,
    ) -> Result<RankingConfig, RankingServiceError> {
        draft.id = draft.id.trim().to_string();
        require_length("id", &draft.id, 1, 64)?;
        require_length("name", draft.name.trim(), 1, 100)?;
        for entry in &draft.dimensions {
            require_non_negative("dimensions_config.weight", entry.weight)?;
        }

        let config = self.repository.insert_config(&draft).map_err(|err| match err {
            RepositoryError::Conflict(_) => RankingServiceError::Conflict(format!(
                "ranking config '{}' already exists",
                draft.id
            )),
            other => other.into(),
        })?;
        info!(config_id = %config.id, dimensions = config.dimensions.len(), "ranking config created");
        Ok(config)
    }

    pub fn update_config(
        &self,
        id: &str,
        patch: RankingConfigPatch,
    ) -> Result<RankingConfig, RankingServiceError> {
        let mut config = self.get_config(id)?;
        if let Some(name) = patch.name {
            config.name = name;
        }
        if let Some(description) = patch.description {
            config.description = description;
        }
        if let Some(dimensions) = patch.dimensions {
            config.dimensions = dimensions;
        }
        if let Some(method) = patch.calculation_method {
            config.calculation_method = method;
        }
        if let Some(active) = patch.is_active {
            config.is_active = active;
        }
        require_length("name", config.name.trim(), 1, 100)?;
        for entry in &config.dimensions {
            require_non_negative("dimensions_config.weight", entry.weight)?;
        }

        Ok(self.repository.update_config(&config)?)
    }

    pub fn delete_config(&self, id: &str) -> Result<(), RankingServiceError> {
        self.get_config(id)?;
        self.repository.delete_config(id)?;
        info!(config_id = %id, "ranking config deleted");
        Ok(())
    }

    pub fn list_settings(&self, app_id: AppId) -> Result<Vec<ParticipationSetting>, RankingServiceError> {
        self.require_app(app_id)?;
        Ok(self.repository.list_settings(app_id)?)
    }

    pub fn get_setting(
        &self,
        app_id: AppId,
        id: SettingId,
    ) -> Result<ParticipationSetting, RankingServiceError> {
        self.repository
            .fetch_setting(id)?
            .filter(|setting| setting.app_id == app_id)
            .ok_or_else(|| RankingServiceError::not_found("ranking setting", id))
    }

    pub fn create_setting(
        &self,
        app_id: AppId,
        draft: ParticipationDraft,
    ) -> Result<ParticipationSetting, RankingServiceError> {
        self.require_app(app_id)?;
        self.get_config(&draft.ranking_config_id)?;
        require_weight("weight_factor", draft.weight_factor)?;
        require_max_length("custom_tags", &draft.custom_tags, MAX_TAG_CHARS)?;

        self.repository
            .insert_setting(app_id, &draft)
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => RankingServiceError::Conflict(format!(
                    "app {app_id} already has a setting for ranking config '{}'",
                    draft.ranking_config_id
                )),
                other => other.into(),
            })
    }

    pub fn update_setting(
        &self,
        app_id: AppId,
        id: SettingId,
        patch: ParticipationPatch,
    ) -> Result<ParticipationSetting, RankingServiceError> {
        let mut setting = self.get_setting(app_id, id)?;
        if let Some(enabled) = patch.is_enabled {
            setting.is_enabled = enabled;
        }
        if let Some(weight) = patch.weight_factor {
            setting.weight_factor = weight;
        }
        if let Some(tags) = patch.custom_tags {
            setting.custom_tags = tags;
        }
        require_weight("weight_factor", setting.weight_factor)?;
        require_max_length("custom_tags", &setting.custom_tags, MAX_TAG_CHARS)?;

        Ok(self.repository.update_setting(&setting)?)
    }

    pub fn delete_setting(&self, app_id: AppId, id: SettingId) -> Result<(), RankingServiceError> {
        self.get_setting(app_id, id)?;
        Ok(self.repository.delete_setting(id)?)
    }

    /// Recompute dimension scores and leaderboards for every active config, or one of them.
    pub fn synchronize(&self, request: SyncRequest) -> Result<SyncReport, RankingServiceError> {
        let scope = match request.ranking_config_id {
            Some(id) => {
                let config = self.get_config(&id)?;
                if !config.is_active {
                    return Err(RankingServiceError::NotFound(format!(
                        "ranking config '{id}' is not active"
                    )));
                }
                SyncScope::Config(id)
            }
            None => SyncScope::All,
        };

        let run_id = match request.run_id {
            Some(run_id) => {
                let run_id = run_id.trim().to_string();
                require_length("run_id", &run_id, 1, MAX_RUN_ID_CHARS)?;
                run_id
            }
            None => uuid::Uuid::new_v4().to_string(),
        };
        let run = RunContext {
            run_id,
            period_date: request.today.unwrap_or_else(|| Local::now().date_naive()),
            synced_at: Utc::now(),
        };

        let _permit = self.guard.acquire(&scope).inspect_err(|busy| {
            warn!(%busy, "rejected overlapping synchronization");
        })?;

        let report = self
            .repository
            .synchronize(&scope, &|inputs| sync::plan(inputs, &run))?;

        info!(
            scope = %scope,
            run_id = %report.run_id,
            period_date = %report.period_date,
            configs = report.config_ids.len(),
            updated_count = report.updated_count,
            dimension_scores = report.dimension_scores,
            removed_rows = report.removed_rows,
            "ranking synchronization committed"
        );
        Ok(report)
    }

    /// Live table when neither date nor run is given, otherwise a historical snapshot.
    pub fn leaderboard(&self, mut query: LeaderboardQuery) -> Result<Leaderboard, RankingServiceError> {
        query.run_id = query.run_id.filter(|run| !run.trim().is_empty());
        if query.period_date.is_none() && query.run_id.is_none() {
            let ranking_type = require_ranking_type(query.ranking_type)?;
            let entries = self.repository.current_rankings(&ranking_type)?;
            return Ok(Leaderboard::Current {
                ranking_type,
                entries,
            });
        }
        self.historical(query)
    }

    /// Omitted date resolves to the latest snapshot date; omitted run to the latest
    /// non-null run of that date, falling back to rows written without a run id.
    pub fn historical(&self, query: LeaderboardQuery) -> Result<Leaderboard, RankingServiceError> {
        let ranking_type = require_ranking_type(query.ranking_type)?;

        let period_date = match query.period_date {
            Some(date) => Some(date),
            None => self.repository.latest_period_date(&ranking_type)?,
        };
        let Some(period_date) = period_date else {
            return Ok(Leaderboard::Historical {
                ranking_type,
                period_date: None,
                run_id: None,
                entries: Vec::new(),
            });
        };

        let run_id = match query.run_id.filter(|run| !run.trim().is_empty()) {
            Some(run) => Some(run),
            None => self.repository.latest_run_id(&ranking_type, period_date)?,
        };
        let selector = match &run_id {
            Some(run) => RunSelector::Run(run.clone()),
            None => RunSelector::Unassigned,
        };

        let entries = self
            .repository
            .historical_rankings(&ranking_type, period_date, &selector)?;
        Ok(Leaderboard::Historical {
            ranking_type,
            period_date: Some(period_date),
            run_id,
            entries,
        })
    }

    pub fn period_dates(&self, ranking_type: String) -> Result<Vec<NaiveDate>, RankingServiceError> {
        let ranking_type = require_ranking_type(ranking_type)?;
        Ok(self.repository.period_dates(&ranking_type)?)
    }

    pub fn dimension_scores(
        &self,
        dimension_id: DimensionId,
        period_date: Option<NaiveDate>,
    ) -> Result<DimensionScoreReport, RankingServiceError> {
        let dimension = self.get_dimension(dimension_id)?;
        let period_date = match period_date {
            Some(date) => Some(date),
            None => self.repository.latest_score_date(dimension_id)?,
        };
        let scores = match period_date {
            Some(date) => self.repository.dimension_scores(dimension_id, date)?,
            None => Vec::new(),
        };
        Ok(DimensionScoreReport {
            dimension,
            period_date,
            scores,
        })
    }

    fn require_app(&self, app_id: AppId) -> Result<(), RankingServiceError> {
        if self.repository.app_exists(app_id)? {
            Ok(())
        } else {
            Err(RankingServiceError::not_found("app", app_id))
        }
    }
}

fn validate_dimension(name: &str, weight: f64) -> Result<(), ValidationError> {
    require_length("name", name, 1, 100)?;
    require_non_negative("weight", weight)
}

fn require_ranking_type(ranking_type: String) -> Result<String, ValidationError> {
    let ranking_type = ranking_type.trim().to_string();
    require_length("ranking_type", &ranking_type, 1, 64)?;
    Ok(ranking_type)
}

fn duplicate_name(err: RepositoryError, name: &str) -> RankingServiceError {
    match err {
        RepositoryError::Conflict(_) => {
            RankingServiceError::Conflict(format!("dimension name '{name}' already exists"))
        }
        other => other.into(),
    }
}

/// Error raised by the ranking service.
#[derive(Debug, thiserror::Error)]
pub enum RankingServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    SyncInProgress(#[from] SyncBusy),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RankingServiceError {
    fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} '{id}' not found"))
    }
}
