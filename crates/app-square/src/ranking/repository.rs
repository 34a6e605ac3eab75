use chrono::NaiveDate;

use super::domain::{
    Dimension, DimensionDraft, DimensionId, DimensionScoreEntry, HistoricalEntry, NewLogEntry,
    ParticipationDraft, ParticipationSetting, RankingConfig, RankingConfigDraft, RankingEntry,
    RankingLog, SettingId, SyncInputs, SyncPlan, SyncReport, SyncScope,
};
use crate::directory::domain::AppId;
pub use crate::repository::RepositoryError;

/// Selects which run of a period a historical read returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelector {
    /// Rows written by the given run.
    Run(String),
    /// Rows written without a run id (legacy snapshots).
    Unassigned,
}

/// Persistence contract for the ranking engine.
///
/// Dimension mutations write their audit entry in the same transaction as the row change;
/// a failed mutation leaves no log behind.
pub trait RankingRepository: Send + Sync {
    fn list_dimensions(&self, active_only: bool) -> Result<Vec<Dimension>, RepositoryError>;
    fn fetch_dimension(&self, id: DimensionId) -> Result<Option<Dimension>, RepositoryError>;
    fn insert_dimension(
        &self,
        draft: &DimensionDraft,
        audit: &NewLogEntry,
    ) -> Result<Dimension, RepositoryError>;
    fn update_dimension(
        &self,
        dimension: &Dimension,
        audit: &NewLogEntry,
    ) -> Result<Dimension, RepositoryError>;
    fn delete_dimension(&self, id: DimensionId, audit: &NewLogEntry)
        -> Result<(), RepositoryError>;
    fn list_logs(&self, limit: usize) -> Result<Vec<RankingLog>, RepositoryError>;

    fn list_configs(&self, active_only: bool) -> Result<Vec<RankingConfig>, RepositoryError>;
    fn fetch_config(&self, id: &str) -> Result<Option<RankingConfig>, RepositoryError>;
    fn insert_config(&self, draft: &RankingConfigDraft) -> Result<RankingConfig, RepositoryError>;
    fn update_config(&self, config: &RankingConfig) -> Result<RankingConfig, RepositoryError>;
    /// Removes the config with its participation settings and live rows; snapshots stay.
    fn delete_config(&self, id: &str) -> Result<(), RepositoryError>;

    fn app_exists(&self, app_id: AppId) -> Result<bool, RepositoryError>;
    fn list_settings(&self, app_id: AppId) -> Result<Vec<ParticipationSetting>, RepositoryError>;
    fn fetch_setting(&self, id: SettingId)
        -> Result<Option<ParticipationSetting>, RepositoryError>;
    fn insert_setting(
        &self,
        app_id: AppId,
        draft: &ParticipationDraft,
    ) -> Result<ParticipationSetting, RepositoryError>;
    fn update_setting(
        &self,
        setting: &ParticipationSetting,
    ) -> Result<ParticipationSetting, RepositoryError>;
    fn delete_setting(&self, id: SettingId) -> Result<(), RepositoryError>;

    /// Loads the sync inputs for `scope`, hands them to `planner`, and writes the plan, all
    /// inside one transaction. Any failure rolls back every write of the run.
    fn synchronize(
        &self,
        scope: &SyncScope,
        planner: &dyn Fn(&SyncInputs) -> SyncPlan,
    ) -> Result<SyncReport, RepositoryError>;

    /// Live leaderboard rows for a config, restricted to province-section apps.
    fn current_rankings(&self, ranking_type: &str) -> Result<Vec<RankingEntry>, RepositoryError>;
    fn latest_period_date(&self, ranking_type: &str) -> Result<Option<NaiveDate>, RepositoryError>;
    /// Most recently written non-null run id for the period, if any.
    fn latest_run_id(
        &self,
        ranking_type: &str,
        period_date: NaiveDate,
    ) -> Result<Option<String>, RepositoryError>;
    /// Snapshot rows for a period and run, restricted to province-section apps.
    fn historical_rankings(
        &self,
        ranking_type: &str,
        period_date: NaiveDate,
        run: &RunSelector,
    ) -> Result<Vec<HistoricalEntry>, RepositoryError>;
    /// Distinct snapshot dates, newest first.
    fn period_dates(&self, ranking_type: &str) -> Result<Vec<NaiveDate>, RepositoryError>;

    fn latest_score_date(
        &self,
        dimension_id: DimensionId,
    ) -> Result<Option<NaiveDate>, RepositoryError>;
    /// Scores recorded for a dimension on a date, highest first.
    fn dimension_scores(
        &self,
        dimension_id: DimensionId,
        period_date: NaiveDate,
    ) -> Result<Vec<DimensionScoreEntry>, RepositoryError>;
}
