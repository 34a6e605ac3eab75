//! Versioned schema for the SQLite store.
//!
//! Each migration runs once, in order, inside its own transaction; `schema_version` records
//! the highest applied version.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::repository::RepositoryError;

/// Ordered (version, SQL) pairs. Append only.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_BASELINE), (2, V2_LEADERBOARD_INDEXES)];

const V1_BASELINE: &str = r#"
CREATE TABLE apps (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    name                  TEXT NOT NULL,
    org                   TEXT NOT NULL,
    section               TEXT NOT NULL CHECK (section IN ('group', 'province')),
    category              TEXT NOT NULL,
    description           TEXT NOT NULL DEFAULT '',
    status                TEXT NOT NULL
                          CHECK (status IN ('available', 'approval', 'beta', 'offline')),
    monthly_calls         REAL NOT NULL DEFAULT 0,
    release_date          TEXT NOT NULL,
    api_open              INTEGER NOT NULL DEFAULT 0,
    difficulty            TEXT NOT NULL DEFAULT 'Low'
                          CHECK (difficulty IN ('Low', 'Medium', 'High')),
    contact_name          TEXT NOT NULL DEFAULT '',
    highlight             TEXT NOT NULL DEFAULT '',
    access_mode           TEXT NOT NULL DEFAULT 'direct'
                          CHECK (access_mode IN ('direct', 'profile')),
    access_url            TEXT NOT NULL DEFAULT '',
    target_system         TEXT NOT NULL DEFAULT '',
    target_users          TEXT NOT NULL DEFAULT '',
    problem_statement     TEXT NOT NULL DEFAULT '',
    effectiveness_type    TEXT NOT NULL DEFAULT 'cost_reduction'
                          CHECK (effectiveness_type IN
                              ('cost_reduction', 'efficiency_gain', 'perception_uplift', 'revenue_growth')),
    effectiveness_metric  TEXT NOT NULL DEFAULT '',
    ranking_enabled       INTEGER NOT NULL DEFAULT 1,
    ranking_weight        REAL NOT NULL DEFAULT 1.0,
    ranking_tags          TEXT NOT NULL DEFAULT '',
    last_ranking_update   TEXT
);

CREATE TABLE submissions (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    app_name              TEXT NOT NULL,
    unit_name             TEXT NOT NULL,
    contact               TEXT NOT NULL,
    contact_phone         TEXT NOT NULL DEFAULT '',
    contact_email         TEXT NOT NULL DEFAULT '',
    category              TEXT NOT NULL,
    scenario              TEXT NOT NULL,
    embedded_system       TEXT NOT NULL,
    problem_statement     TEXT NOT NULL,
    effectiveness_type    TEXT NOT NULL,
    effectiveness_metric  TEXT NOT NULL,
    data_level            TEXT NOT NULL,
    expected_benefit      TEXT NOT NULL,
    status                TEXT NOT NULL DEFAULT 'pending'
                          CHECK (status IN ('pending', 'approved', 'rejected')),
    created_at            TEXT NOT NULL,
    ranking_enabled       INTEGER NOT NULL DEFAULT 1,
    ranking_weight        REAL NOT NULL DEFAULT 1.0,
    ranking_tags          TEXT NOT NULL DEFAULT '',
    ranking_dimensions    TEXT NOT NULL DEFAULT ''
);

CREATE TABLE submission_images (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_id   INTEGER NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
    image_url       TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE ranking_dimensions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL UNIQUE,
    description         TEXT NOT NULL DEFAULT '',
    calculation_method  TEXT NOT NULL DEFAULT '',
    weight              REAL NOT NULL DEFAULT 1.0,
    is_active           INTEGER NOT NULL DEFAULT 1,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

-- dimension_id is a snapshot, not a foreign key: delete logs outlive their dimension.
CREATE TABLE ranking_logs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    action          TEXT NOT NULL CHECK (action IN ('create', 'update', 'delete')),
    dimension_id    INTEGER,
    dimension_name  TEXT NOT NULL,
    changes         TEXT NOT NULL,
    operator        TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE ranking_configs (
    id                  TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    description         TEXT NOT NULL DEFAULT '',
    dimensions_config   TEXT NOT NULL DEFAULT '[]',
    calculation_method  TEXT NOT NULL DEFAULT 'composite',
    is_active           INTEGER NOT NULL DEFAULT 1,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE app_ranking_settings (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id              INTEGER NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
    ranking_config_id   TEXT NOT NULL REFERENCES ranking_configs(id) ON DELETE CASCADE,
    is_enabled          INTEGER NOT NULL DEFAULT 0,
    weight_factor       REAL NOT NULL DEFAULT 1.0,
    custom_tags         TEXT NOT NULL DEFAULT '',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (app_id, ranking_config_id)
);

CREATE TABLE app_dimension_scores (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    app_id              INTEGER NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
    dimension_id        INTEGER NOT NULL REFERENCES ranking_dimensions(id) ON DELETE CASCADE,
    dimension_name      TEXT NOT NULL,
    score               INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
    weight              REAL NOT NULL,
    calculation_detail  TEXT NOT NULL DEFAULT '',
    period_date         TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (app_id, dimension_id, period_date)
);

CREATE TABLE rankings (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    ranking_config_id   TEXT NOT NULL REFERENCES ranking_configs(id) ON DELETE CASCADE,
    ranking_type        TEXT NOT NULL,
    position            INTEGER NOT NULL,
    app_id              INTEGER NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
    tag                 TEXT NOT NULL,
    score               INTEGER NOT NULL,
    likes               INTEGER,
    metric_type         TEXT NOT NULL,
    value_dimension     TEXT NOT NULL,
    usage_30d           INTEGER NOT NULL DEFAULT 0,
    declared_at         TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (ranking_config_id, app_id)
);

-- No foreign keys: snapshots survive config deletion and carry denormalized app fields.
CREATE TABLE historical_rankings (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    ranking_config_id   TEXT NOT NULL,
    ranking_type        TEXT NOT NULL,
    period_date         TEXT NOT NULL,
    run_id              TEXT,
    position            INTEGER NOT NULL,
    app_id              INTEGER NOT NULL,
    app_name            TEXT NOT NULL,
    app_org             TEXT NOT NULL,
    tag                 TEXT NOT NULL,
    score               INTEGER NOT NULL,
    metric_type         TEXT NOT NULL,
    value_dimension     TEXT NOT NULL,
    usage_30d           INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    UNIQUE (ranking_config_id, app_id, period_date, run_id)
);
"#;

const V2_LEADERBOARD_INDEXES: &str = r#"
CREATE INDEX idx_apps_section_status ON apps(section, status);
CREATE INDEX idx_submissions_status ON submissions(status, created_at);
CREATE INDEX idx_rankings_type_position ON rankings(ranking_type, position);
CREATE INDEX idx_historical_type_period_run ON historical_rankings(ranking_type, period_date, run_id);
CREATE INDEX idx_dimension_scores_dimension_period ON app_dimension_scores(dimension_id, period_date);
CREATE INDEX idx_settings_config_enabled ON app_ranking_settings(ranking_config_id, is_enabled);
"#;

/// Latest version this build knows how to create.
pub fn target_version() -> i64 {
    MIGRATIONS.last().map(|(version, _)| *version).unwrap_or(0)
}

/// Bring the database up to [`target_version`]. Refuses databases written by a newer build.
pub fn init_schema(conn: &mut Connection) -> Result<i64, RepositoryError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );",
    )?;

    let current = current_version(conn)?;
    let target = target_version();
    if current > target {
        return Err(RepositoryError::Unavailable(format!(
            "database schema version {current} is newer than supported version {target}"
        )));
    }

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![version, chrono::Utc::now()],
        )?;
        tx.commit()?;
        info!(version, "applied schema migration");
    }

    Ok(target)
}

pub fn current_version(conn: &Connection) -> Result<i64, RepositoryError> {
    let version: Option<i64> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_apply_once() {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        assert_eq!(init_schema(&mut conn).expect("first run"), target_version());
        assert_eq!(init_schema(&mut conn).expect("second run"), target_version());

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .expect("count versions");
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[test]
    fn refuses_newer_databases() {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&mut conn).expect("migrates");
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, '2030-01-01T00:00:00Z')",
            params![target_version() + 1],
        )
        .expect("bump version");

        assert!(matches!(
            init_schema(&mut conn),
            Err(RepositoryError::Unavailable(_))
        ));
    }
}
