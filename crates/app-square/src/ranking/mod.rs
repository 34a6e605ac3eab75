//! Multi-dimensional leaderboards: dimension catalog, ranking configs, participation
//! settings, the scorer, and the synchronizer that persists live and dated leaderboards.

pub(crate) mod audit;
pub mod domain;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod sync;

#[cfg(test)]
mod tests;

pub use domain::{
    Dimension, DimensionDraft, DimensionId, DimensionMap, DimensionPatch, DimensionScore,
    DimensionScoreEntry, DimensionWeight, HistoricalEntry, LogAction, ParticipationDraft,
    ParticipationPatch, ParticipationSetting, RankingConfig, RankingConfigDraft,
    RankingConfigPatch, RankingEntry, RankingLog, SettingId, Standing, SyncPlan, SyncReport,
    SyncScope, DEFAULT_TAG,
};
pub use repository::{RankingRepository, RunSelector};
pub use router::{ranking_router, RankingState};
pub use scoring::{assess_application, score_application, score_dimension, ScoreCard, ScoringRule};
pub use service::{
    DimensionScoreReport, Leaderboard, LeaderboardQuery, RankingService, RankingServiceError,
    SyncRequest,
};
