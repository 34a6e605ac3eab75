use std::sync::Arc;

use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::params;
use serde_json::Value;

use crate::auth::AdminGuard;
use crate::directory::domain::{
    AccessMode, AppId, AppStatus, Application, Difficulty, EffectivenessType, Section,
};
use crate::ranking::domain::{
    Dimension, DimensionDraft, DimensionId, DimensionMap, DimensionWeight, Participant,
    ParticipationSetting, RankingConfig, RankingConfigDraft, RunContext, SettingId,
};
use crate::ranking::{ranking_router, RankingService};
use crate::store::SqliteStore;

pub(super) const ADMIN_TOKEN: &str = "test-admin-token";
pub(super) const OPERATOR: &str = "tester";

pub(super) fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn application(id: i64, monthly_calls: f64) -> Application {
    Application {
        id: AppId(id),
        name: format!("app-{id}"),
        org: "信息技术部".to_string(),
        section: Section::Province,
        category: "办公类".to_string(),
        description: "document drafting assistant".to_string(),
        status: AppStatus::Available,
        monthly_calls,
        release_date: date(2024, 11, 1),
        api_open: false,
        difficulty: Difficulty::Low,
        contact_name: String::new(),
        highlight: String::new(),
        access_mode: AccessMode::Direct,
        access_url: String::new(),
        target_system: String::new(),
        target_users: String::new(),
        problem_statement: String::new(),
        effectiveness_type: EffectivenessType::EfficiencyGain,
        effectiveness_metric: String::new(),
        ranking_enabled: true,
        ranking_weight: 1.0,
        ranking_tags: String::new(),
        last_ranking_update: None,
    }
}

pub(super) fn dimension(id: i64, name: &str) -> Dimension {
    Dimension {
        id: DimensionId(id),
        name: name.to_string(),
        description: String::new(),
        calculation_method: String::new(),
        weight: 1.0,
        is_active: true,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub(super) fn dimension_map(dimensions: Vec<Dimension>) -> DimensionMap {
    dimensions
        .into_iter()
        .map(|dimension| (dimension.id, dimension))
        .collect()
}

pub(super) fn weights(entries: &[(i64, f64)]) -> Vec<DimensionWeight> {
    entries
        .iter()
        .map(|(id, weight)| DimensionWeight {
            dimension_id: DimensionId(*id),
            weight: *weight,
        })
        .collect()
}

pub(super) fn config(id: &str, entries: &[(i64, f64)]) -> RankingConfig {
    RankingConfig {
        id: id.to_string(),
        name: format!("{id} board"),
        description: String::new(),
        dimensions: weights(entries),
        calculation_method: "composite".to_string(),
        is_active: true,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub(super) fn participant(app: Application, config_id: &str, weight_factor: f64) -> Participant {
    Participant {
        setting: ParticipationSetting {
            id: SettingId(app.id.0 * 100),
            app_id: app.id,
            ranking_config_id: config_id.to_string(),
            is_enabled: true,
            weight_factor,
            custom_tags: String::new(),
            created_at: timestamp(),
            updated_at: timestamp(),
        },
        app,
    }
}

pub(super) fn run(period_date: NaiveDate) -> RunContext {
    RunContext {
        run_id: "run-test".to_string(),
        period_date,
        synced_at: timestamp(),
    }
}

pub(super) fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().expect("in-memory store"))
}

pub(super) fn service(store: &Arc<SqliteStore>) -> RankingService<SqliteStore> {
    RankingService::new(Arc::clone(store))
}

pub(super) fn router(store: &Arc<SqliteStore>) -> Router {
    ranking_router(Arc::new(service(store)), AdminGuard::with_token(ADMIN_TOKEN))
}

/// Directory row written straight to the store so tests control every scored field.
pub(super) struct AppSeed {
    pub name: &'static str,
    pub section: Section,
    pub status: AppStatus,
    pub difficulty: Difficulty,
    pub effectiveness_type: EffectivenessType,
    pub monthly_calls: f64,
    pub ranking_tags: &'static str,
}

impl Default for AppSeed {
    fn default() -> Self {
        Self {
            name: "公文助手",
            section: Section::Province,
            status: AppStatus::Available,
            difficulty: Difficulty::Low,
            effectiveness_type: EffectivenessType::EfficiencyGain,
            monthly_calls: 1.0,
            ranking_tags: "",
        }
    }
}

pub(super) fn seed_app(store: &SqliteStore, seed: AppSeed) -> AppId {
    store
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO apps (name, org, section, category, status, monthly_calls,
                                   release_date, difficulty, effectiveness_type, ranking_tags)
                 VALUES (?1, '省公司', ?2, '办公类', ?3, ?4, '2024-11-01', ?5, ?6, ?7)",
                params![
                    seed.name,
                    seed.section.label(),
                    seed.status.label(),
                    seed.monthly_calls,
                    seed.difficulty.label(),
                    seed.effectiveness_type.label(),
                    seed.ranking_tags,
                ],
            )?;
            Ok(AppId(conn.last_insert_rowid()))
        })
        .expect("seed app")
}

/// Creates the standard catalog: 用户满意度 (user satisfaction) and 业务价值 (business value).
pub(super) fn seed_catalog(service: &RankingService<SqliteStore>) -> (Dimension, Dimension) {
    let satisfaction = service
        .create_dimension(dimension_draft("用户满意度"), OPERATOR)
        .expect("create satisfaction");
    let value = service
        .create_dimension(dimension_draft("业务价值"), OPERATOR)
        .expect("create business value");
    (satisfaction, value)
}

pub(super) fn dimension_draft(name: &str) -> DimensionDraft {
    DimensionDraft {
        name: name.to_string(),
        description: format!("{name} rubric"),
        calculation_method: "rule table".to_string(),
        weight: 1.0,
        is_active: true,
    }
}

pub(super) fn config_draft(id: &str, entries: &[(DimensionId, f64)]) -> RankingConfigDraft {
    RankingConfigDraft {
        id: id.to_string(),
        name: format!("{id} board"),
        description: String::new(),
        dimensions: entries
            .iter()
            .map(|(dimension_id, weight)| DimensionWeight {
                dimension_id: *dimension_id,
                weight: *weight,
            })
            .collect(),
        calculation_method: "composite".to_string(),
        is_active: true,
    }
}

/// Opts `app_id` into `config_id` with the given multiplier.
pub(super) fn enroll(
    service: &RankingService<SqliteStore>,
    app_id: AppId,
    config_id: &str,
    weight_factor: f64,
) -> ParticipationSetting {
    service
        .create_setting(
            app_id,
            crate::ranking::domain::ParticipationDraft {
                ranking_config_id: config_id.to_string(),
                is_enabled: true,
                weight_factor,
                custom_tags: String::new(),
            },
        )
        .expect("enroll app")
}

pub(super) fn admin_request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
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
