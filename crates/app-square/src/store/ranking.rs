use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use super::directory::load_app;
use super::{parse_column, SqliteStore};
use crate::directory::domain::{AppId, AppSummary};
use crate::ranking::domain::{
    Dimension, DimensionDraft, DimensionId, DimensionMap, DimensionScoreEntry, DimensionWeight,
    HistoricalEntry, NewLogEntry, Participant, ParticipationDraft, ParticipationSetting,
    RankingConfig, RankingConfigDraft, RankingEntry, RankingLog, SettingId, SyncInputs, SyncPlan,
    SyncReport, SyncScope,
};
use crate::ranking::repository::{RankingRepository, RunSelector};
use crate::repository::RepositoryError;

pub(super) const SETTING_COLUMNS: &str =
    "id, app_id, ranking_config_id, is_enabled, weight_factor, custom_tags, created_at, updated_at";

pub(super) fn load_setting(row: &Row<'_>) -> rusqlite::Result<ParticipationSetting> {
    Ok(ParticipationSetting {
        id: SettingId(row.get("id")?),
        app_id: AppId(row.get("app_id")?),
        ranking_config_id: row.get("ranking_config_id")?,
        is_enabled: row.get("is_enabled")?,
        weight_factor: row.get("weight_factor")?,
        custom_tags: row.get("custom_tags")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn dimension_from_row(row: &Row<'_>) -> rusqlite::Result<Dimension> {
    Ok(Dimension {
        id: DimensionId(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
        calculation_method: row.get("calculation_method")?,
        weight: row.get("weight")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn config_from_row(row: &Row<'_>) -> rusqlite::Result<RankingConfig> {
    let raw: String = row.get("dimensions_config")?;
    let dimensions: Vec<DimensionWeight> = serde_json::from_str(&raw).map_err(|err| {
        let index = row.as_ref().column_index("dimensions_config").unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
    })?;
    Ok(RankingConfig {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        dimensions,
        calculation_method: row.get("calculation_method")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<RankingLog> {
    Ok(RankingLog {
        id: row.get("id")?,
        action: parse_column(row, "action")?,
        dimension_id: row.get::<_, Option<i64>>("dimension_id")?.map(DimensionId),
        dimension_name: row.get("dimension_name")?,
        changes: row.get("changes")?,
        operator: row.get("operator")?,
        created_at: row.get("created_at")?,
    })
}

fn ranking_entry_from_row(row: &Row<'_>) -> rusqlite::Result<RankingEntry> {
    Ok(RankingEntry {
        ranking_config_id: row.get("ranking_config_id")?,
        ranking_type: row.get("ranking_type")?,
        position: row.get("position")?,
        tag: row.get("tag")?,
        score: row.get("score")?,
        likes: row.get("likes")?,
        metric_type: row.get("metric_type")?,
        value_dimension: row.get("value_dimension")?,
        usage_30d: row.get("usage_30d")?,
        declared_at: row.get("declared_at")?,
        updated_at: row.get("updated_at")?,
        app: AppSummary {
            id: AppId(row.get("app_id")?),
            name: row.get("app_name")?,
            org: row.get("app_org")?,
            section: parse_column(row, "app_section")?,
            category: row.get("app_category")?,
            description: row.get("app_description")?,
            status: parse_column(row, "app_status")?,
            monthly_calls: row.get("app_monthly_calls")?,
            release_date: row.get("app_release_date")?,
        },
    })
}

fn historical_from_row(row: &Row<'_>) -> rusqlite::Result<HistoricalEntry> {
    Ok(HistoricalEntry {
        ranking_config_id: row.get("ranking_config_id")?,
        ranking_type: row.get("ranking_type")?,
        period_date: row.get("period_date")?,
        run_id: row.get("run_id")?,
        position: row.get("position")?,
        app_id: AppId(row.get("app_id")?),
        app_name: row.get("app_name")?,
        app_org: row.get("app_org")?,
        tag: row.get("tag")?,
        score: row.get("score")?,
        metric_type: row.get("metric_type")?,
        value_dimension: row.get("value_dimension")?,
        usage_30d: row.get("usage_30d")?,
        created_at: row.get("created_at")?,
    })
}

fn score_entry_from_row(row: &Row<'_>) -> rusqlite::Result<DimensionScoreEntry> {
    Ok(DimensionScoreEntry {
        app_id: AppId(row.get("app_id")?),
        app_name: row.get("app_name")?,
        dimension_id: DimensionId(row.get("dimension_id")?),
        dimension_name: row.get("dimension_name")?,
        score: row.get("score")?,
        weight: row.get("weight")?,
        calculation_detail: row.get("calculation_detail")?,
        period_date: row.get("period_date")?,
        updated_at: row.get("updated_at")?,
    })
}

fn load_dimension(conn: &Connection, id: DimensionId) -> Result<Option<Dimension>, RepositoryError> {
    let dimension = conn
        .query_row(
            "SELECT * FROM ranking_dimensions WHERE id = ?1",
            params![id.0],
            dimension_from_row,
        )
        .optional()?;
    Ok(dimension)
}

fn load_config(conn: &Connection, id: &str) -> Result<Option<RankingConfig>, RepositoryError> {
    let config = conn
        .query_row(
            "SELECT * FROM ranking_configs WHERE id = ?1",
            params![id],
            config_from_row,
        )
        .optional()?;
    Ok(config)
}

fn load_setting_by_id(
    conn: &Connection,
    id: SettingId,
) -> Result<Option<ParticipationSetting>, RepositoryError> {
    let setting = conn
        .query_row(
            &format!("SELECT {SETTING_COLUMNS} FROM app_ranking_settings WHERE id = ?1"),
            params![id.0],
            load_setting,
        )
        .optional()?;
    Ok(setting)
}

fn append_log(
    conn: &Connection,
    dimension_id: DimensionId,
    entry: &NewLogEntry,
) -> Result<(), RepositoryError> {
    conn.execute(
        "INSERT INTO ranking_logs
            (action, dimension_id, dimension_name, changes, operator, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.action.label(),
            dimension_id.0,
            entry.dimension_name,
            entry.changes,
            entry.operator,
            Utc::now(),
        ],
    )?;
    Ok(())
}

/// Snapshot read by the planner: active configs (by id), active dimensions, and enabled
/// participants (by config, then app id). Participants whose app row is gone are skipped.
fn load_sync_inputs(tx: &Transaction<'_>, scope: &SyncScope) -> Result<SyncInputs, RepositoryError> {
    let only = match scope {
        SyncScope::All => None,
        SyncScope::Config(id) => Some(id.as_str()),
    };

    let configs = {
        let mut stmt = tx.prepare(
            "SELECT * FROM ranking_configs
             WHERE is_active = 1 AND (?1 IS NULL OR id = ?1)
             ORDER BY id",
        )?;
        let configs = stmt
            .query_map(params![only], config_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        configs
    };

    let dimensions: DimensionMap = {
        let mut stmt =
            tx.prepare("SELECT * FROM ranking_dimensions WHERE is_active = 1 ORDER BY id")?;
        let dimensions = stmt
            .query_map([], dimension_from_row)?
            .map(|dimension| dimension.map(|dimension| (dimension.id, dimension)))
            .collect::<Result<DimensionMap, _>>()?;
        dimensions
    };

    let mut participants = Vec::new();
    let mut stmt = tx.prepare(&format!(
        "SELECT {SETTING_COLUMNS} FROM app_ranking_settings
         WHERE ranking_config_id = ?1 AND is_enabled = 1
         ORDER BY app_id"
    ))?;
    for config in &configs {
        let settings = stmt
            .query_map(params![config.id], load_setting)?
            .collect::<Result<Vec<_>, _>>()?;
        for setting in settings {
            match load_app(tx, setting.app_id)? {
                Some(app) => participants.push(Participant { setting, app }),
                None => warn!(
                    config_id = %config.id,
                    app_id = setting.app_id.0,
                    "skipping participation for missing app"
                ),
            }
        }
    }

    debug!(
        configs = configs.len(),
        dimensions = dimensions.len(),
        participants = participants.len(),
        "loaded synchronization inputs"
    );
    Ok(SyncInputs {
        configs,
        dimensions,
        participants,
    })
}

fn write_plan(tx: &Transaction<'_>, plan: &SyncPlan) -> Result<SyncReport, RepositoryError> {
    let run = &plan.run;

    for score in &plan.dimension_scores {
        tx.execute(
            "INSERT INTO app_dimension_scores
                (app_id, dimension_id, dimension_name, score, weight, calculation_detail,
                 period_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT (app_id, dimension_id, period_date) DO UPDATE SET
                dimension_name = excluded.dimension_name,
                score = excluded.score,
                weight = excluded.weight,
                calculation_detail = excluded.calculation_detail,
                updated_at = excluded.updated_at",
            params![
                score.app_id.0,
                score.dimension_id.0,
                score.dimension_name,
                score.score,
                score.weight,
                score.calculation_detail,
                score.period_date,
                run.synced_at,
            ],
        )?;
    }

    let mut removed_rows = 0;
    for config_id in &plan.config_ids {
        let keep: HashSet<AppId> = plan.participants_of(config_id).collect();
        let existing = {
            let mut stmt = tx.prepare("SELECT app_id FROM rankings WHERE ranking_config_id = ?1")?;
            let existing = stmt
                .query_map(params![config_id], |row| row.get::<_, i64>(0).map(AppId))?
                .collect::<Result<Vec<_>, _>>()?;
            existing
        };
        for app_id in existing.into_iter().filter(|app_id| !keep.contains(app_id)) {
            removed_rows += tx.execute(
                "DELETE FROM rankings WHERE ranking_config_id = ?1 AND app_id = ?2",
                params![config_id, app_id.0],
            )?;
        }
    }

    let mut touched_apps = BTreeSet::new();
    for standing in &plan.standings {
        tx.execute(
            "INSERT INTO rankings
                (ranking_config_id, ranking_type, position, app_id, tag, score, metric_type,
                 value_dimension, usage_30d, declared_at, updated_at)
             VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (ranking_config_id, app_id) DO UPDATE SET
                position = excluded.position,
                tag = excluded.tag,
                score = excluded.score,
                metric_type = excluded.metric_type,
                value_dimension = excluded.value_dimension,
                usage_30d = excluded.usage_30d,
                updated_at = excluded.updated_at",
            params![
                standing.ranking_config_id,
                standing.position,
                standing.app_id.0,
                standing.tag,
                standing.score,
                standing.metric_type,
                standing.value_dimension,
                standing.usage_30d,
                run.period_date,
                run.synced_at,
            ],
        )?;

        tx.execute(
            "INSERT INTO historical_rankings
                (ranking_config_id, ranking_type, period_date, run_id, position, app_id,
                 app_name, app_org, tag, score, metric_type, value_dimension, usage_30d,
                 created_at)
             SELECT ?1, ?1, ?2, ?3, ?4, id, name, org, ?5, ?6, ?7, ?8, ?9, ?10
             FROM apps WHERE id = ?11
             ON CONFLICT (ranking_config_id, app_id, period_date, run_id) DO UPDATE SET
                position = excluded.position,
                app_name = excluded.app_name,
                app_org = excluded.app_org,
                tag = excluded.tag,
                score = excluded.score,
                metric_type = excluded.metric_type,
                value_dimension = excluded.value_dimension,
                usage_30d = excluded.usage_30d",
            params![
                standing.ranking_config_id,
                run.period_date,
                run.run_id,
                standing.position,
                standing.tag,
                standing.score,
                standing.metric_type,
                standing.value_dimension,
                standing.usage_30d,
                run.synced_at,
                standing.app_id.0,
            ],
        )?;

        touched_apps.insert(standing.app_id);
    }

    for app_id in &touched_apps {
        tx.execute(
            "UPDATE apps SET last_ranking_update = ?1 WHERE id = ?2",
            params![run.synced_at, app_id.0],
        )?;
    }

    Ok(SyncReport {
        run_id: run.run_id.clone(),
        period_date: run.period_date,
        updated_count: plan.standings.len(),
        config_ids: plan.config_ids.clone(),
        dimension_scores: plan.dimension_scores.len(),
        removed_rows,
    })
}

impl RankingRepository for SqliteStore {
    fn list_dimensions(&self, active_only: bool) -> Result<Vec<Dimension>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM ranking_dimensions
                 WHERE ?1 = 0 OR is_active = 1
                 ORDER BY id",
            )?;
            let dimensions = stmt
                .query_map(params![active_only], dimension_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(dimensions)
        })
    }

    fn fetch_dimension(&self, id: DimensionId) -> Result<Option<Dimension>, RepositoryError> {
        self.with_conn(|conn| load_dimension(conn, id))
    }

    fn insert_dimension(
        &self,
        draft: &DimensionDraft,
        audit: &NewLogEntry,
    ) -> Result<Dimension, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now();
            tx.execute(
                "INSERT INTO ranking_dimensions
                    (name, description, calculation_method, weight, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    draft.name,
                    draft.description,
                    draft.calculation_method,
                    draft.weight,
                    draft.is_active,
                    now,
                ],
            )?;
            let id = DimensionId(tx.last_insert_rowid());
            append_log(&tx, id, audit)?;
            let dimension =
                load_dimension(&tx, id)?.ok_or_else(|| RepositoryError::not_found("dimension", id))?;
            tx.commit()?;
            Ok(dimension)
        })
    }

    fn update_dimension(
        &self,
        dimension: &Dimension,
        audit: &NewLogEntry,
    ) -> Result<Dimension, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE ranking_dimensions SET
                    name = ?1, description = ?2, calculation_method = ?3, weight = ?4,
                    is_active = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    dimension.name,
                    dimension.description,
                    dimension.calculation_method,
                    dimension.weight,
                    dimension.is_active,
                    Utc::now(),
                    dimension.id.0,
                ],
            )?;
            if changed == 0 {
                return Err(RepositoryError::not_found("dimension", dimension.id));
            }
            append_log(&tx, dimension.id, audit)?;
            let updated = load_dimension(&tx, dimension.id)?
                .ok_or_else(|| RepositoryError::not_found("dimension", dimension.id))?;
            tx.commit()?;
            Ok(updated)
        })
    }

    fn delete_dimension(&self, id: DimensionId, audit: &NewLogEntry) -> Result<(), RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            append_log(&tx, id, audit)?;
            let changed = tx.execute("DELETE FROM ranking_dimensions WHERE id = ?1", params![id.0])?;
            if changed == 0 {
                return Err(RepositoryError::not_found("dimension", id));
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn list_logs(&self, limit: usize) -> Result<Vec<RankingLog>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM ranking_logs ORDER BY id DESC LIMIT ?1")?;
            let logs = stmt
                .query_map(params![limit as i64], log_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(logs)
        })
    }

    fn list_configs(&self, active_only: bool) -> Result<Vec<RankingConfig>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM ranking_configs
                 WHERE ?1 = 0 OR is_active = 1
                 ORDER BY id",
            )?;
            let configs = stmt
                .query_map(params![active_only], config_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(configs)
        })
    }

    fn fetch_config(&self, id: &str) -> Result<Option<RankingConfig>, RepositoryError> {
        self.with_conn(|conn| load_config(conn, id))
    }

    fn insert_config(&self, draft: &RankingConfigDraft) -> Result<RankingConfig, RepositoryError> {
        let dimensions = serde_json::to_string(&draft.dimensions)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO ranking_configs
                    (id, name, description, dimensions_config, calculation_method, is_active,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    draft.id,
                    draft.name,
                    draft.description,
                    dimensions,
                    draft.calculation_method,
                    draft.is_active,
                    Utc::now(),
                ],
            )?;
            load_config(conn, &draft.id)?
                .ok_or_else(|| RepositoryError::not_found("ranking config", &draft.id))
        })
    }

    fn update_config(&self, config: &RankingConfig) -> Result<RankingConfig, RepositoryError> {
        let dimensions = serde_json::to_string(&config.dimensions)?;
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE ranking_configs SET
                    name = ?1, description = ?2, dimensions_config = ?3,
                    calculation_method = ?4, is_active = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    config.name,
                    config.description,
                    dimensions,
                    config.calculation_method,
                    config.is_active,
                    Utc::now(),
                    config.id,
                ],
            )?;
            if changed == 0 {
                return Err(RepositoryError::not_found("ranking config", &config.id));
            }
            load_config(conn, &config.id)?
                .ok_or_else(|| RepositoryError::not_found("ranking config", &config.id))
        })
    }

    fn delete_config(&self, id: &str) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM ranking_configs WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(RepositoryError::not_found("ranking config", id));
            }
            Ok(())
        })
    }

    fn app_exists(&self, app_id: AppId) -> Result<bool, RepositoryError> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM apps WHERE id = ?1)",
                params![app_id.0],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn list_settings(&self, app_id: AppId) -> Result<Vec<ParticipationSetting>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SETTING_COLUMNS} FROM app_ranking_settings
                 WHERE app_id = ?1 ORDER BY ranking_config_id"
            ))?;
            let settings = stmt
                .query_map(params![app_id.0], load_setting)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(settings)
        })
    }

    fn fetch_setting(
        &self,
        id: SettingId,
    ) -> Result<Option<ParticipationSetting>, RepositoryError> {
        self.with_conn(|conn| load_setting_by_id(conn, id))
    }

    fn insert_setting(
        &self,
        app_id: AppId,
        draft: &ParticipationDraft,
    ) -> Result<ParticipationSetting, RepositoryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO app_ranking_settings
                    (app_id, ranking_config_id, is_enabled, weight_factor, custom_tags,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    app_id.0,
                    draft.ranking_config_id,
                    draft.is_enabled,
                    draft.weight_factor,
                    draft.custom_tags,
                    Utc::now(),
                ],
            )?;
            let id = SettingId(conn.last_insert_rowid());
            load_setting_by_id(conn, id)?
                .ok_or_else(|| RepositoryError::not_found("ranking setting", id))
        })
    }

    fn update_setting(
        &self,
        setting: &ParticipationSetting,
    ) -> Result<ParticipationSetting, RepositoryError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE app_ranking_settings SET
                    is_enabled = ?1, weight_factor = ?2, custom_tags = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    setting.is_enabled,
                    setting.weight_factor,
                    setting.custom_tags,
                    Utc::now(),
                    setting.id.0,
                ],
            )?;
            if changed == 0 {
                return Err(RepositoryError::not_found("ranking setting", setting.id));
            }
            load_setting_by_id(conn, setting.id)?
                .ok_or_else(|| RepositoryError::not_found("ranking setting", setting.id))
        })
    }

    fn delete_setting(&self, id: SettingId) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            let changed =
                conn.execute("DELETE FROM app_ranking_settings WHERE id = ?1", params![id.0])?;
            if changed == 0 {
                return Err(RepositoryError::not_found("ranking setting", id));
            }
            Ok(())
        })
    }

    fn synchronize(
        &self,
        scope: &SyncScope,
        planner: &dyn Fn(&SyncInputs) -> SyncPlan,
    ) -> Result<SyncReport, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let inputs = load_sync_inputs(&tx, scope)?;
            let plan = planner(&inputs);
            let report = write_plan(&tx, &plan)?;
            tx.commit()?;
            Ok(report)
        })
    }

    fn current_rankings(&self, ranking_type: &str) -> Result<Vec<RankingEntry>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.ranking_config_id, r.ranking_type, r.position, r.app_id, r.tag,
                        r.score, r.likes, r.metric_type, r.value_dimension, r.usage_30d,
                        r.declared_at, r.updated_at,
                        a.name AS app_name, a.org AS app_org, a.section AS app_section,
                        a.category AS app_category, a.description AS app_description,
                        a.status AS app_status, a.monthly_calls AS app_monthly_calls,
                        a.release_date AS app_release_date
                 FROM rankings r
                 JOIN apps a ON a.id = r.app_id
                 WHERE r.ranking_type = ?1 AND a.section = 'province'
                 ORDER BY r.position, r.app_id",
            )?;
            let entries = stmt
                .query_map(params![ranking_type], ranking_entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    fn latest_period_date(&self, ranking_type: &str) -> Result<Option<NaiveDate>, RepositoryError> {
        self.with_conn(|conn| {
            let latest = conn.query_row(
                "SELECT MAX(period_date) FROM historical_rankings WHERE ranking_type = ?1",
                params![ranking_type],
                |row| row.get(0),
            )?;
            Ok(latest)
        })
    }

    fn latest_run_id(
        &self,
        ranking_type: &str,
        period_date: NaiveDate,
    ) -> Result<Option<String>, RepositoryError> {
        self.with_conn(|conn| {
            let run_id = conn
                .query_row(
                    "SELECT run_id FROM historical_rankings
                     WHERE ranking_type = ?1 AND period_date = ?2 AND run_id IS NOT NULL
                     ORDER BY id DESC LIMIT 1",
                    params![ranking_type, period_date],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(run_id)
        })
    }

    fn historical_rankings(
        &self,
        ranking_type: &str,
        period_date: NaiveDate,
        run: &RunSelector,
    ) -> Result<Vec<HistoricalEntry>, RepositoryError> {
        let run_id = match run {
            RunSelector::Run(run_id) => Some(run_id.as_str()),
            RunSelector::Unassigned => None,
        };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT h.* FROM historical_rankings h
                 JOIN apps a ON a.id = h.app_id
                 WHERE h.ranking_type = ?1 AND h.period_date = ?2 AND h.run_id IS ?3
                   AND a.section = 'province'
                 ORDER BY h.position, h.app_id",
            )?;
            let entries = stmt
                .query_map(params![ranking_type, period_date, run_id], historical_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    fn period_dates(&self, ranking_type: &str) -> Result<Vec<NaiveDate>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT period_date FROM historical_rankings
                 WHERE ranking_type = ?1
                 ORDER BY period_date DESC",
            )?;
            let dates = stmt
                .query_map(params![ranking_type], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(dates)
        })
    }

    fn latest_score_date(
        &self,
        dimension_id: DimensionId,
    ) -> Result<Option<NaiveDate>, RepositoryError> {
        self.with_conn(|conn| {
            let latest = conn.query_row(
                "SELECT MAX(period_date) FROM app_dimension_scores WHERE dimension_id = ?1",
                params![dimension_id.0],
                |row| row.get(0),
            )?;
            Ok(latest)
        })
    }

    fn dimension_scores(
        &self,
        dimension_id: DimensionId,
        period_date: NaiveDate,
    ) -> Result<Vec<DimensionScoreEntry>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.*, a.name AS app_name FROM app_dimension_scores s
                 JOIN apps a ON a.id = s.app_id
                 WHERE s.dimension_id = ?1 AND s.period_date = ?2
                 ORDER BY s.score DESC, s.app_id",
            )?;
            let scores = stmt
                .query_map(params![dimension_id.0, period_date], score_entry_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(scores)
        })
    }
}

