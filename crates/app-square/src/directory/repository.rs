use serde::Serialize;

use super::domain::{
    AppFilter, AppId, Application, DirectoryStats, NewApplication, NewSubmission,
    RankingParamsUpdate, Submission, SubmissionId, SubmissionStatus,
};
use crate::ranking::domain::ParticipationSetting;
pub use crate::repository::RepositoryError;

/// Result of approving a submission: the new directory entry and its seeded settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Approval {
    pub app: Application,
    pub ranking_settings: Vec<ParticipationSetting>,
    pub submission: Submission,
}

/// Storage abstraction for directory entries and submissions.
pub trait DirectoryRepository: Send + Sync {
    /// Matching applications ordered by id.
    fn list_apps(&self, filter: &AppFilter) -> Result<Vec<Application>, RepositoryError>;
    fn fetch_app(&self, id: AppId) -> Result<Option<Application>, RepositoryError>;
    /// Applies the update to every listed app, or to none if any id is unknown.
    fn update_ranking_params(&self, update: &RankingParamsUpdate)
        -> Result<usize, RepositoryError>;

    fn insert_submission(&self, submission: &NewSubmission)
        -> Result<Submission, RepositoryError>;
    /// Newest first.
    fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, RepositoryError>;
    fn fetch_submission(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError>;
    /// Moves a pending submission to `status`; `Conflict` if it is no longer pending.
    fn resolve_submission(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> Result<Submission, RepositoryError>;
    /// Atomically creates the application, seeds a disabled participation setting for every
    /// active ranking config, and marks the submission approved.
    fn approve_submission(
        &self,
        id: SubmissionId,
        app: &NewApplication,
    ) -> Result<Approval, RepositoryError>;
    fn stats(&self) -> Result<DirectoryStats, RepositoryError>;
}
