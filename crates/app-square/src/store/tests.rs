use std::path::PathBuf;

use chrono::{NaiveDate, TimeZone, Utc};
use rusqlite::params;

use super::{contains_pattern, schema, SqliteStore};
use crate::config::DatabaseConfig;
use crate::directory::domain::AppId;
use crate::directory::DirectoryRepository;
use crate::ranking::domain::{
    DimensionDraft, LogAction, NewLogEntry, ParticipationDraft, RankingConfigDraft, RunContext,
    Standing, SyncInputs, SyncPlan, SyncScope,
};
use crate::ranking::sync;
use crate::ranking::RankingRepository;
use crate::repository::RepositoryError;

fn seed_app(store: &SqliteStore, name: &str) -> AppId {
    store
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO apps (name, org, section, category, status, monthly_calls, release_date)
                 VALUES (?1, '省公司', 'province', '办公类', 'available', 5.0, '2024-10-01')",
                params![name],
            )?;
            Ok(AppId(conn.last_insert_rowid()))
        })
        .expect("seed app")
}

fn run(run_id: &str) -> RunContext {
    RunContext {
        run_id: run_id.to_string(),
        period_date: NaiveDate::from_ymd_opt(2025, 5, 20).expect("valid date"),
        synced_at: Utc
            .with_ymd_and_hms(2025, 5, 20, 2, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

fn log_entry(name: &str) -> NewLogEntry {
    NewLogEntry {
        action: LogAction::Create,
        dimension_name: name.to_string(),
        changes: format!("created {name}"),
        operator: "store-test".to_string(),
    }
}

/// One config scoring one enabled app on 用户满意度.
fn seed_board(store: &SqliteStore) -> AppId {
    let dimension = store
        .insert_dimension(
            &DimensionDraft {
                name: "用户满意度".to_string(),
                description: String::new(),
                calculation_method: String::new(),
                weight: 1.0,
                is_active: true,
            },
            &log_entry("用户满意度"),
        )
        .expect("dimension");
    store
        .insert_config(&RankingConfigDraft {
            id: "excellent".to_string(),
            name: "优秀应用".to_string(),
            description: String::new(),
            dimensions: vec![crate::ranking::DimensionWeight {
                dimension_id: dimension.id,
                weight: 1.0,
            }],
            calculation_method: "composite".to_string(),
            is_active: true,
        })
        .expect("config");
    let app = seed_app(store, "公文助手");
    store
        .insert_setting(
            app,
            &ParticipationDraft {
                ranking_config_id: "excellent".to_string(),
                is_enabled: true,
                weight_factor: 1.0,
                custom_tags: String::new(),
            },
        )
        .expect("setting");
    app
}

fn row_count(store: &SqliteStore, table: &str) -> i64 {
    store
        .with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?)
        })
        .expect("count rows")
}

#[test]
fn fresh_store_is_at_the_target_schema_version() {
    let store = SqliteStore::open(&DatabaseConfig {
        path: PathBuf::from(":memory:"),
    })
    .expect("open");

    let version = store
        .with_conn(|conn| schema::current_version(conn))
        .expect("version");
    assert_eq!(version, schema::target_version());
}

#[test]
fn failed_write_rolls_back_the_whole_run() {
    let store = SqliteStore::open_in_memory().expect("store");
    seed_board(&store);

    let context = run("good");
    store
        .synchronize(&SyncScope::All, &|inputs| sync::plan(inputs, &context))
        .expect("first sync");
    assert_eq!(row_count(&store, "rankings"), 1);

    let broken = run("broken");
    let err = store
        .synchronize(&SyncScope::All, &|inputs: &SyncInputs| {
            let mut plan: SyncPlan = sync::plan(inputs, &broken);
            plan.standings.push(Standing {
                ranking_config_id: "excellent".to_string(),
                position: 2,
                app_id: AppId(9_999),
                tag: "推荐".to_string(),
                score: 1,
                metric_type: "composite".to_string(),
                value_dimension: "cost_reduction".to_string(),
                usage_30d: 0,
            });
            plan
        })
        .expect_err("dangling app id");

    assert!(matches!(err, RepositoryError::NotFound(_)), "{err:?}");
    assert_eq!(row_count(&store, "rankings"), 1);
    assert_eq!(row_count(&store, "historical_rankings"), 1);
    let runs: Vec<String> = store
        .with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT run_id FROM historical_rankings")?;
            let runs = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(runs)
        })
        .expect("runs");
    assert_eq!(runs, vec!["good".to_string()]);
}

#[test]
fn duplicate_dimension_leaves_no_audit_row() {
    let store = SqliteStore::open_in_memory().expect("store");
    let draft = DimensionDraft {
        name: "业务价值".to_string(),
        description: String::new(),
        calculation_method: String::new(),
        weight: 1.0,
        is_active: true,
    };
    store
        .insert_dimension(&draft, &log_entry("业务价值"))
        .expect("first insert");

    let err = store
        .insert_dimension(&draft, &log_entry("业务价值"))
        .expect_err("duplicate");

    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert_eq!(row_count(&store, "ranking_logs"), 1);
}

#[test]
fn deleting_an_app_cascades_to_settings_and_live_rows() {
    let store = SqliteStore::open_in_memory().expect("store");
    let app = seed_board(&store);
    let context = run("nightly");
    store
        .synchronize(&SyncScope::All, &|inputs| sync::plan(inputs, &context))
        .expect("sync");

    store
        .with_conn(|conn| {
            conn.execute("DELETE FROM apps WHERE id = ?1", params![app.0])?;
            Ok(())
        })
        .expect("delete app");

    assert_eq!(row_count(&store, "app_ranking_settings"), 0);
    assert_eq!(row_count(&store, "rankings"), 0);
    assert_eq!(row_count(&store, "app_dimension_scores"), 0);
    assert_eq!(row_count(&store, "historical_rankings"), 1);
}

#[test]
fn approval_is_atomic_when_the_submission_is_not_pending() {
    let store = SqliteStore::open_in_memory().expect("store");
    store
        .with_conn(|conn| {
            conn.execute(
                "INSERT INTO submissions
                    (app_name, unit_name, contact, category, scenario, embedded_system,
                     problem_statement, effectiveness_type, effectiveness_metric, data_level,
                     expected_benefit, status, created_at)
                 VALUES ('巡检助手', '运维部', '李工', '办公类', '设备巡检记录自动生成与异常提示',
                         '运维平台', '巡检记录手工填写耗时', 'cost_reduction', '工时',
                         'L1', '每月节省两百工时', 'rejected', '2025-01-01 00:00:00+00:00')",
                [],
            )?;
            Ok(())
        })
        .expect("seed submission");
    let submission = store
        .list_submissions(None)
        .expect("submissions")
        .remove(0);

    let err = store
        .approve_submission(
            submission.id,
            &submission.to_application(NaiveDate::from_ymd_opt(2025, 1, 2).expect("date")),
        )
        .expect_err("not pending");

    assert!(matches!(err, RepositoryError::Conflict(_)));
    assert_eq!(row_count(&store, "apps"), 0);
}

#[test]
fn like_patterns_escape_wildcards() {
    assert_eq!(contains_pattern("智能"), "%智能%");
    assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
}
