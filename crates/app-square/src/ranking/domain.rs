use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::domain::{AppId, AppSummary, Application, UnknownVariant};

/// Tag applied to a leaderboard row when neither the participation nor the app supplies one.
pub const DEFAULT_TAG: &str = "推荐";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionId(pub i64);

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingId(pub i64);

impl fmt::Display for SettingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, scorable criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: DimensionId,
    pub name: String,
    pub description: String,
    pub calculation_method: String,
    pub weight: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Active dimensions keyed by id, as seen by the scorer.
pub type DimensionMap = BTreeMap<DimensionId, Dimension>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DimensionDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub calculation_method: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DimensionPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub calculation_method: Option<String>,
    pub weight: Option<f64>,
    pub is_active: Option<bool>,
}

/// One entry of a config's dimension list. Accepts the legacy `dim_id` key on input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionWeight {
    #[serde(alias = "dim_id")]
    pub dimension_id: DimensionId,
    pub weight: f64,
}

/// A named leaderboard definition. Its id doubles as the leaderboard's `ranking_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "dimensions_config")]
    pub dimensions: Vec<DimensionWeight>,
    pub calculation_method: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankingConfigDraft {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "dimensions_config")]
    pub dimensions: Vec<DimensionWeight>,
    #[serde(default = "default_method")]
    pub calculation_method: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RankingConfigPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "dimensions_config")]
    pub dimensions: Option<Vec<DimensionWeight>>,
    pub calculation_method: Option<String>,
    pub is_active: Option<bool>,
}

/// Per (app, config) opt-in with a weight multiplier and optional tag override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationSetting {
    pub id: SettingId,
    pub app_id: AppId,
    pub ranking_config_id: String,
    pub is_enabled: bool,
    pub weight_factor: f64,
    pub custom_tags: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParticipationDraft {
    pub ranking_config_id: String,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default = "default_weight")]
    pub weight_factor: f64,
    #[serde(default)]
    pub custom_tags: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParticipationPatch {
    pub is_enabled: Option<bool>,
    pub weight_factor: Option<f64>,
    pub custom_tags: Option<String>,
}

/// Per-dimension score computed for one app during a sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScore {
    pub app_id: AppId,
    pub dimension_id: DimensionId,
    pub dimension_name: String,
    pub score: u8,
    pub weight: f64,
    pub calculation_detail: String,
    pub period_date: NaiveDate,
}

/// Stored dimension score joined with the owning app's name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScoreEntry {
    pub app_id: AppId,
    pub app_name: String,
    pub dimension_id: DimensionId,
    pub dimension_name: String,
    pub score: u8,
    pub weight: f64,
    pub calculation_detail: String,
    pub period_date: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

/// One row of a leaderboard produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    pub ranking_config_id: String,
    pub position: u32,
    pub app_id: AppId,
    pub tag: String,
    pub score: u32,
    pub metric_type: String,
    pub value_dimension: String,
    pub usage_30d: i64,
}

/// A live leaderboard row with its application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub ranking_config_id: String,
    pub ranking_type: String,
    pub position: u32,
    pub tag: String,
    pub score: u32,
    pub likes: Option<i64>,
    pub metric_type: String,
    pub value_dimension: String,
    pub usage_30d: i64,
    pub declared_at: NaiveDate,
    pub updated_at: DateTime<Utc>,
    pub app: AppSummary,
}

/// A dated leaderboard snapshot row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalEntry {
    pub ranking_config_id: String,
    pub ranking_type: String,
    pub period_date: NaiveDate,
    pub run_id: Option<String>,
    pub position: u32,
    pub app_id: AppId,
    pub app_name: String,
    pub app_org: String,
    pub tag: String,
    pub score: u32,
    pub metric_type: String,
    pub value_dimension: String,
    pub usage_30d: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Create,
    Update,
    Delete,
}

impl LogAction {
    pub const fn label(self) -> &'static str {
        match self {
            LogAction::Create => "create",
            LogAction::Update => "update",
            LogAction::Delete => "delete",
        }
    }
}

impl FromStr for LogAction {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(LogAction::Create),
            "update" => Ok(LogAction::Update),
            "delete" => Ok(LogAction::Delete),
            _ => Err(UnknownVariant::new(
                "log action",
                value,
                &["create", "update", "delete"],
            )),
        }
    }
}

/// Audit record of a dimension mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingLog {
    pub id: i64,
    pub action: LogAction,
    pub dimension_id: Option<DimensionId>,
    pub dimension_name: String,
    pub changes: String,
    pub operator: String,
    pub created_at: DateTime<Utc>,
}

/// Audit payload written alongside a dimension mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub action: LogAction,
    pub dimension_name: String,
    pub changes: String,
    pub operator: String,
}

/// Which configs a sync covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncScope {
    All,
    Config(String),
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncScope::All => f.write_str("all configs"),
            SyncScope::Config(id) => write!(f, "config '{id}'"),
        }
    }
}

/// Identity of a single sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub run_id: String,
    pub period_date: NaiveDate,
    pub synced_at: DateTime<Utc>,
}

/// An enabled participation joined with its application.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub setting: ParticipationSetting,
    pub app: Application,
}

/// Everything the planner reads, loaded inside the sync transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncInputs {
    pub configs: Vec<RankingConfig>,
    pub dimensions: DimensionMap,
    pub participants: Vec<Participant>,
}

/// Everything a sync writes.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub run: RunContext,
    pub config_ids: Vec<String>,
    pub dimension_scores: Vec<DimensionScore>,
    pub standings: Vec<Standing>,
}

impl SyncPlan {
    pub fn participants_of<'a>(&'a self, config_id: &'a str) -> impl Iterator<Item = AppId> + 'a {
        self.standings
            .iter()
            .filter(move |standing| standing.ranking_config_id == config_id)
            .map(|standing| standing.app_id)
    }
}

/// Outcome of a committed sync.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub period_date: NaiveDate,
    pub updated_count: usize,
    pub config_ids: Vec<String>,
    pub dimension_scores: usize,
    pub removed_rows: usize,
}

fn default_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "composite".to_string()
}
