use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::info;

use super::domain::{
    AppFilter, AppId, Application, DataLevel, DirectoryStats, EffectivenessType, NewSubmission,
    RankingParamsUpdate, Recommendation, RuleLink, Submission, SubmissionDraft, SubmissionId,
    SubmissionStatus, UnknownVariant, RECOMMENDATIONS, RULE_PAGES,
};
use super::repository::{Approval, DirectoryRepository, RepositoryError};
use crate::validation::{
    require_length, require_max_length, require_weight, ValidationError, MAX_TAG_CHARS,
};

/// Category value the portal uses for "no category filter".
pub const ALL_CATEGORIES: &str = "全部";

pub const DEFAULT_RULE_BASE_URL: &str = "https://oa.example.internal";

/// Directory listing, ranking parameter maintenance and submission review.
pub struct DirectoryService<D> {
    repository: Arc<D>,
    rule_base_url: String,
}

impl<D> DirectoryService<D>
where
    D: DirectoryRepository + 'static,
{
    pub fn new(repository: Arc<D>) -> Self {
        Self {
            repository,
            rule_base_url: DEFAULT_RULE_BASE_URL.to_string(),
        }
    }

    /// Base URL of the OA site hosting the rule pages.
    pub fn with_rule_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.rule_base_url = base_url.into();
        self
    }

    pub fn stats(&self) -> Result<DirectoryStats, DirectoryServiceError> {
        Ok(self.repository.stats()?)
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        RECOMMENDATIONS
            .iter()
            .map(|(title, scene)| Recommendation {
                title: (*title).to_string(),
                scene: (*scene).to_string(),
            })
            .collect()
    }

    pub fn rules(&self) -> Vec<RuleLink> {
        let base = self.rule_base_url.trim_end_matches('/');
        RULE_PAGES
            .iter()
            .map(|(title, path)| RuleLink {
                title: (*title).to_string(),
                href: format!("{base}/{path}"),
            })
            .collect()
    }

    pub fn list_apps(&self, mut filter: AppFilter) -> Result<Vec<Application>, DirectoryServiceError> {
        filter.category = filter
            .category
            .filter(|category| !category.is_empty() && category != ALL_CATEGORIES);
        filter.query = filter
            .query
            .map(|query| query.trim().to_string())
            .filter(|query| !query.is_empty());
        Ok(self.repository.list_apps(&filter)?)
    }

    pub fn get_app(&self, id: AppId) -> Result<Application, DirectoryServiceError> {
        self.repository
            .fetch_app(id)?
            .ok_or_else(|| DirectoryServiceError::NotFound(format!("app '{id}' not found")))
    }

    pub fn update_ranking_params(
        &self,
        update: RankingParamsUpdate,
    ) -> Result<usize, DirectoryServiceError> {
        if update.app_ids.is_empty() {
            return Err(ValidationError::new("app_ids", "must list at least one app").into());
        }
        if update.is_empty() {
            return Err(ValidationError::new("ranking_params", "no fields to update").into());
        }
        if let Some(weight) = update.ranking_weight {
            require_weight("ranking_weight", weight)?;
        }
        if let Some(tags) = &update.ranking_tags {
            require_max_length("ranking_tags", tags, MAX_TAG_CHARS)?;
        }

        let updated = self.repository.update_ranking_params(&update)?;
        info!(updated, "ranking parameters updated");
        Ok(updated)
    }

    pub fn create_submission(
        &self,
        draft: SubmissionDraft,
    ) -> Result<Submission, DirectoryServiceError> {
        let submission = validate_submission(draft)?;
        let stored = self.repository.insert_submission(&submission)?;
        info!(submission_id = stored.id.0, app_name = %stored.app_name, "submission received");
        Ok(stored)
    }

    pub fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, DirectoryServiceError> {
        Ok(self.repository.list_submissions(status)?)
    }

    pub fn get_submission(&self, id: SubmissionId) -> Result<Submission, DirectoryServiceError> {
        self.repository.fetch_submission(id)?.ok_or_else(|| {
            DirectoryServiceError::NotFound(format!("submission '{id}' not found"))
        })
    }

    /// Approve a pending submission, listing it in the province section as of `today`.
    pub fn approve_submission(
        &self,
        id: SubmissionId,
        today: Option<NaiveDate>,
    ) -> Result<Approval, DirectoryServiceError> {
        let submission = self.pending_submission(id)?;
        let today = today.unwrap_or_else(|| Local::now().date_naive());
        let approval = self
            .repository
            .approve_submission(id, &submission.to_application(today))
            .map_err(|err| not_pending(err, id))?;
        info!(
            submission_id = id.0,
            app_id = approval.app.id.0,
            seeded_settings = approval.ranking_settings.len(),
            "submission approved"
        );
        Ok(approval)
    }

    pub fn reject_submission(&self, id: SubmissionId) -> Result<Submission, DirectoryServiceError> {
        self.pending_submission(id)?;
        let submission = self
            .repository
            .resolve_submission(id, SubmissionStatus::Rejected)
            .map_err(|err| not_pending(err, id))?;
        info!(submission_id = id.0, "submission rejected");
        Ok(submission)
    }

    fn pending_submission(&self, id: SubmissionId) -> Result<Submission, DirectoryServiceError> {
        let submission = self.get_submission(id)?;
        if submission.status != SubmissionStatus::Pending {
            return Err(DirectoryServiceError::Conflict(format!(
                "submission '{id}' is already {}",
                submission.status.label()
            )));
        }
        Ok(submission)
    }
}

fn not_pending(err: RepositoryError, id: SubmissionId) -> DirectoryServiceError {
    match err {
        RepositoryError::Conflict(_) => {
            DirectoryServiceError::Conflict(format!("submission '{id}' is no longer pending"))
        }
        other => other.into(),
    }
}

fn validate_submission(draft: SubmissionDraft) -> Result<NewSubmission, ValidationError> {
    let app_name = draft.app_name.trim().to_string();
    let unit_name = draft.unit_name.trim().to_string();
    let contact = draft.contact.trim().to_string();

    require_length("app_name", &app_name, 2, 120)?;
    require_length("unit_name", &unit_name, 2, 120)?;
    require_length("contact", &contact, 2, 80)?;
    require_max_length("contact_phone", &draft.contact_phone, 40)?;
    require_max_length("contact_email", &draft.contact_email, 120)?;
    require_length("category", &draft.category, 1, 60)?;
    require_length("scenario", &draft.scenario, 20, 500)?;
    require_length("embedded_system", &draft.embedded_system, 2, 120)?;
    require_length("problem_statement", &draft.problem_statement, 10, 255)?;
    require_length("effectiveness_metric", &draft.effectiveness_metric, 2, 120)?;
    require_length("expected_benefit", &draft.expected_benefit, 10, 300)?;
    require_weight("ranking_weight", draft.ranking_weight)?;
    require_max_length("ranking_tags", &draft.ranking_tags, MAX_TAG_CHARS)?;
    require_max_length("ranking_dimensions", &draft.ranking_dimensions, 500)?;

    let effectiveness_type = draft
        .effectiveness_type
        .parse::<EffectivenessType>()
        .map_err(|err| variant_error("effectiveness_type", err))?;
    let data_level = draft
        .data_level
        .parse::<DataLevel>()
        .map_err(|err| variant_error("data_level", err))?;

    Ok(NewSubmission {
        app_name,
        unit_name,
        contact,
        contact_phone: draft.contact_phone,
        contact_email: draft.contact_email,
        category: draft.category,
        scenario: draft.scenario,
        embedded_system: draft.embedded_system,
        problem_statement: draft.problem_statement,
        effectiveness_type,
        effectiveness_metric: draft.effectiveness_metric,
        data_level,
        expected_benefit: draft.expected_benefit,
        ranking_enabled: draft.ranking_enabled,
        ranking_weight: draft.ranking_weight,
        ranking_tags: draft.ranking_tags,
        ranking_dimensions: draft.ranking_dimensions,
    })
}

fn variant_error(field: &'static str, err: UnknownVariant) -> ValidationError {
    ValidationError::new(field, format!("must be one of: {}", err.expected))
}

/// Error raised by the directory service.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
