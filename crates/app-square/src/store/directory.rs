use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

use super::ranking::{load_setting, SETTING_COLUMNS};
use super::{contains_pattern, parse_column, SqliteStore};
use crate::directory::domain::{
    AppFilter, AppId, Application, DirectoryStats, NewApplication, NewSubmission,
    RankingParamsUpdate, Submission, SubmissionId, SubmissionStatus,
};
use crate::directory::repository::{Approval, DirectoryRepository};
use crate::repository::RepositoryError;

pub(super) fn app_from_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        id: AppId(row.get("id")?),
        name: row.get("name")?,
        org: row.get("org")?,
        section: parse_column(row, "section")?,
        category: row.get("category")?,
        description: row.get("description")?,
        status: parse_column(row, "status")?,
        monthly_calls: row.get("monthly_calls")?,
        release_date: row.get("release_date")?,
        api_open: row.get("api_open")?,
        difficulty: parse_column(row, "difficulty")?,
        contact_name: row.get("contact_name")?,
        highlight: row.get("highlight")?,
        access_mode: parse_column(row, "access_mode")?,
        access_url: row.get("access_url")?,
        target_system: row.get("target_system")?,
        target_users: row.get("target_users")?,
        problem_statement: row.get("problem_statement")?,
        effectiveness_type: parse_column(row, "effectiveness_type")?,
        effectiveness_metric: row.get("effectiveness_metric")?,
        ranking_enabled: row.get("ranking_enabled")?,
        ranking_weight: row.get("ranking_weight")?,
        ranking_tags: row.get("ranking_tags")?,
        last_ranking_update: row.get("last_ranking_update")?,
    })
}

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: SubmissionId(row.get("id")?),
        app_name: row.get("app_name")?,
        unit_name: row.get("unit_name")?,
        contact: row.get("contact")?,
        contact_phone: row.get("contact_phone")?,
        contact_email: row.get("contact_email")?,
        category: row.get("category")?,
        scenario: row.get("scenario")?,
        embedded_system: row.get("embedded_system")?,
        problem_statement: row.get("problem_statement")?,
        effectiveness_type: parse_column(row, "effectiveness_type")?,
        effectiveness_metric: row.get("effectiveness_metric")?,
        data_level: parse_column(row, "data_level")?,
        expected_benefit: row.get("expected_benefit")?,
        status: parse_column(row, "status")?,
        created_at: row.get("created_at")?,
        ranking_enabled: row.get("ranking_enabled")?,
        ranking_weight: row.get("ranking_weight")?,
        ranking_tags: row.get("ranking_tags")?,
        ranking_dimensions: row.get("ranking_dimensions")?,
    })
}

pub(super) fn load_app(conn: &Connection, id: AppId) -> Result<Option<Application>, RepositoryError> {
    let app = conn
        .query_row("SELECT * FROM apps WHERE id = ?1", params![id.0], app_from_row)
        .optional()?;
    Ok(app)
}

fn load_submission(
    conn: &Connection,
    id: SubmissionId,
) -> Result<Option<Submission>, RepositoryError> {
    let submission = conn
        .query_row(
            "SELECT * FROM submissions WHERE id = ?1",
            params![id.0],
            submission_from_row,
        )
        .optional()?;
    Ok(submission)
}

pub(super) fn insert_app(conn: &Connection, app: &NewApplication) -> Result<AppId, RepositoryError> {
    conn.execute(
        "INSERT INTO apps (
            name, org, section, category, description, status, monthly_calls, release_date,
            difficulty, problem_statement, target_system, effectiveness_type,
            effectiveness_metric, ranking_enabled, ranking_weight, ranking_tags
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            app.name,
            app.org,
            app.section.label(),
            app.category,
            app.description,
            app.status.label(),
            app.monthly_calls,
            app.release_date,
            app.difficulty.label(),
            app.problem_statement,
            app.target_system,
            app.effectiveness_type.label(),
            app.effectiveness_metric,
            app.ranking_enabled,
            app.ranking_weight,
            app.ranking_tags,
        ],
    )?;
    Ok(AppId(conn.last_insert_rowid()))
}

/// Pending -> `status` in place; distinguishes a missing row from an already-resolved one.
fn transition_submission(
    conn: &Connection,
    id: SubmissionId,
    status: SubmissionStatus,
) -> Result<(), RepositoryError> {
    let changed = conn.execute(
        "UPDATE submissions SET status = ?1 WHERE id = ?2 AND status = 'pending'",
        params![status.label(), id.0],
    )?;
    if changed == 0 {
        return match load_submission(conn, id)? {
            Some(existing) => Err(RepositoryError::conflict(format!(
                "submission '{id}' is already {}",
                existing.status.label()
            ))),
            None => Err(RepositoryError::not_found("submission", id)),
        };
    }
    Ok(())
}

impl DirectoryRepository for SqliteStore {
    fn list_apps(&self, filter: &AppFilter) -> Result<Vec<Application>, RepositoryError> {
        let mut sql = String::from("SELECT * FROM apps WHERE 1 = 1");
        let mut values: Vec<Value> = Vec::new();

        if let Some(section) = filter.section {
            sql.push_str(" AND section = ?");
            values.push(Value::Text(section.label().to_string()));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.label().to_string()));
        }
        if let Some(category) = &filter.category {
            sql.push_str(" AND category = ?");
            values.push(Value::Text(category.clone()));
        }
        if let Some(query) = &filter.query {
            sql.push_str(" AND (name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')");
            let pattern = contains_pattern(query);
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        sql.push_str(" ORDER BY id");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let apps = stmt
                .query_map(params_from_iter(values.iter()), app_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(apps)
        })
    }

    fn fetch_app(&self, id: AppId) -> Result<Option<Application>, RepositoryError> {
        self.with_conn(|conn| load_app(conn, id))
    }

    fn update_ranking_params(
        &self,
        update: &RankingParamsUpdate,
    ) -> Result<usize, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut ids = update.app_ids.clone();
            ids.sort();
            ids.dedup();

            let mut updated = 0;
            for id in ids {
                let changed = tx.execute(
                    "UPDATE apps SET
                        ranking_enabled = COALESCE(?1, ranking_enabled),
                        ranking_weight = COALESCE(?2, ranking_weight),
                        ranking_tags = COALESCE(?3, ranking_tags)
                     WHERE id = ?4",
                    params![
                        update.ranking_enabled,
                        update.ranking_weight,
                        update.ranking_tags,
                        id.0
                    ],
                )?;
                if changed == 0 {
                    return Err(RepositoryError::not_found("app", id));
                }
                updated += changed;
            }

            tx.commit()?;
            Ok(updated)
        })
    }

    fn insert_submission(
        &self,
        submission: &NewSubmission,
    ) -> Result<Submission, RepositoryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO submissions (
                    app_name, unit_name, contact, contact_phone, contact_email, category,
                    scenario, embedded_system, problem_statement, effectiveness_type,
                    effectiveness_metric, data_level, expected_benefit, status, created_at,
                    ranking_enabled, ranking_weight, ranking_tags, ranking_dimensions
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, 'pending',
                          ?14, ?15, ?16, ?17, ?18)",
                params![
                    submission.app_name,
                    submission.unit_name,
                    submission.contact,
                    submission.contact_phone,
                    submission.contact_email,
                    submission.category,
                    submission.scenario,
                    submission.embedded_system,
                    submission.problem_statement,
                    submission.effectiveness_type.label(),
                    submission.effectiveness_metric,
                    submission.data_level.label(),
                    submission.expected_benefit,
                    Utc::now(),
                    submission.ranking_enabled,
                    submission.ranking_weight,
                    submission.ranking_tags,
                    submission.ranking_dimensions,
                ],
            )?;
            let id = SubmissionId(conn.last_insert_rowid());
            load_submission(conn, id)?.ok_or_else(|| RepositoryError::not_found("submission", id))
        })
    }

    fn list_submissions(
        &self,
        status: Option<SubmissionStatus>,
    ) -> Result<Vec<Submission>, RepositoryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM submissions
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let submissions = stmt
                .query_map(params![status.map(SubmissionStatus::label)], submission_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(submissions)
        })
    }

    fn fetch_submission(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        self.with_conn(|conn| load_submission(conn, id))
    }

    fn resolve_submission(
        &self,
        id: SubmissionId,
        status: SubmissionStatus,
    ) -> Result<Submission, RepositoryError> {
        self.with_conn(|conn| {
            transition_submission(conn, id, status)?;
            load_submission(conn, id)?.ok_or_else(|| RepositoryError::not_found("submission", id))
        })
    }

    fn approve_submission(
        &self,
        id: SubmissionId,
        app: &NewApplication,
    ) -> Result<Approval, RepositoryError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            transition_submission(&tx, id, SubmissionStatus::Approved)?;
            let app_id = insert_app(&tx, app)?;

            let now = Utc::now();
            tx.execute(
                "INSERT INTO app_ranking_settings
                    (app_id, ranking_config_id, is_enabled, weight_factor, custom_tags,
                     created_at, updated_at)
                 SELECT ?1, id, 0, 1.0, '', ?2, ?2 FROM ranking_configs
                 WHERE is_active = 1 ORDER BY id",
                params![app_id.0, now],
            )?;

            let created = load_app(&tx, app_id)?
                .ok_or_else(|| RepositoryError::not_found("app", app_id))?;
            let ranking_settings = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SETTING_COLUMNS} FROM app_ranking_settings
                     WHERE app_id = ?1 ORDER BY ranking_config_id"
                ))?;
                let settings = stmt
                    .query_map(params![app_id.0], load_setting)?
                    .collect::<Result<Vec<_>, _>>()?;
                settings
            };
            let submission = load_submission(&tx, id)?
                .ok_or_else(|| RepositoryError::not_found("submission", id))?;

            tx.commit()?;
            Ok(Approval {
                app: created,
                ranking_settings,
                submission,
            })
        })
    }
    fn stats(&self) -> Result<DirectoryStats, RepositoryError> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM submissions WHERE status = 'pending'),
                    (SELECT COUNT(*) FROM submissions WHERE status = 'approved'),
                    (SELECT COUNT(*) FROM apps)",
                [],
                |row| {
                    Ok(DirectoryStats {
                        pending: row.get(0)?,
                        approved_period: row.get(1)?,
                        total_apps: row.get(2)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}
