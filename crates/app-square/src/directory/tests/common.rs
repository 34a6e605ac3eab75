use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use axum::Router;
use chrono::NaiveDate;
use rusqlite::params;
use serde_json::{json, Value};

use crate::auth::AdminGuard;
use crate::directory::domain::{
    AppFilter, AppId, Application, DirectoryStats, NewApplication, NewSubmission,
    RankingParamsUpdate, Submission, SubmissionDraft, SubmissionId, SubmissionStatus,
};
use crate::directory::repository::{Approval, DirectoryRepository, RepositoryError};
use crate::directory::{directory_router, DirectoryService};
use crate::store::SqliteStore;

pub(super) const ADMIN_TOKEN: &str = "directory-admin";
pub(super) const RULE_BASE_URL: &str = "https://oa.portal.test/";

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date")
}

pub(super) fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().expect("in-memory store"))
}

pub(super) fn service(store: &Arc<SqliteStore>) -> DirectoryService<SqliteStore> {
    DirectoryService::new(Arc::clone(store)).with_rule_base_url(RULE_BASE_URL)
}

pub(super) fn router(store: &Arc<SqliteStore>) -> Router {
    directory_router(Arc::new(service(store)), AdminGuard::with_token(ADMIN_TOKEN))
}

pub(super) fn draft() -> SubmissionDraft {
    serde_json::from_value(draft_json()).expect("valid draft")
}

pub(super) fn draft_json() -> Value {
    json!({
        "app_name": "合同智能审查",
        "unit_name": "法律事务部",
        "contact": "王工",
        "contact_phone": "13800000000",
        "scenario": "对采购合同进行条款比对与风险提示，减少人工审查时间和遗漏",
        "embedded_system": "合同管理系统",
        "problem_statement": "合同审查周期长且依赖个人经验",
        "effectiveness_type": "revenue_growth",
        "effectiveness_metric": "审查时长",
        "data_level": "L2",
        "expected_benefit": "单份合同审查时间从两天缩短到半天",
        "ranking_tags": "风控"
    })
}

/// Inserts a ranking config row directly; the directory only reads them when seeding settings.
pub(super) fn seed_config(store: &SqliteStore, id: &str, active: bool) {
    store
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO ranking_configs (id, name, is_active, created_at, updated_at)
                 VALUES (?1, ?1, ?2, '2025-01-01 00:00:00+00:00', '2025-01-01 00:00:00+00:00')",
                params![id, active],
            )?;
            Ok(())
        })
        .expect("seed config");
}

pub(super) async fn read_json_body(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Repository whose backing store is gone.
pub(super) struct UnavailableDirectory;

impl UnavailableDirectory {
    fn down<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("database file is locked".to_string()))
    }
}

impl DirectoryRepository for UnavailableDirectory {
    fn list_apps(&self, _filter: &AppFilter) -> Result<Vec<Application>, RepositoryError> {
        Self::down()
    }

    fn fetch_app(&self, _id: AppId) -> Result<Option<Application>, RepositoryError> {
        Self::down()
    }

    fn update_ranking_params(
        &self,
        _update: &RankingParamsUpdate,
    ) -> Result<usize, RepositoryError> {
        Self::down()
    }

    fn insert_submission(
        &self,
        _submission: &NewSubmission,
    ) -> Result<Submission, RepositoryError> {
        Self::down()
    }

    fn list_submissions(
        &self,
        _status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, RepositoryError> {
        Self::down()
    }

    fn fetch_submission(&self, _id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        Self::down()
    }

    fn resolve_submission(
        &self,
        _id: SubmissionId,
        _status: SubmissionStatus,
    ) -> Result<Submission, RepositoryError> {
        Self::down()
    }

    fn approve_submission(
        &self,
        _id: SubmissionId,
        _app: &NewApplication,
    ) -> Result<Approval, RepositoryError> {
        Self::down()
    }

    fn stats(&self) -> Result<DirectoryStats, RepositoryError> {
        Self::down()
    }
}
