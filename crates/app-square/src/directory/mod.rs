//! Application directory, ranking parameter maintenance, and submission review.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AccessMode, AppFilter, AppId, AppStatus, AppSummary, Application, DataLevel, Difficulty,
    DirectoryStats, EffectivenessType, NewApplication, NewSubmission, RankingParamsUpdate,
    Recommendation, RuleLink, Section, Submission, SubmissionDraft, SubmissionId,
    SubmissionStatus, UnknownVariant,
};
pub use repository::{Approval, DirectoryRepository};
pub use router::{directory_router, DirectoryState};
pub use service::{DirectoryService, DirectoryServiceError, DEFAULT_RULE_BASE_URL};
