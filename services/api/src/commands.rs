use crate::infra::{parse_date, Portal};
use app_square::config::AppConfig;
use app_square::error::AppError;
use app_square::ranking::{Leaderboard, LeaderboardQuery, SyncReport, SyncRequest};
use app_square::telemetry;
use chrono::NaiveDate;
use clap::Args;
use std::fmt::Write as _;

#[derive(Args, Debug, Default)]
pub(crate) struct SyncArgs {
    /// Limit the run to one ranking config (defaults to every active config)
    #[arg(long)]
    pub(crate) config: Option<String>,
    /// Identifier recorded on the historical snapshot (defaults to a fresh UUID)
    #[arg(long)]
    pub(crate) run_id: Option<String>,
    /// Snapshot date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
    /// Ranking config id to display
    #[arg(long)]
    pub(crate) config: String,
    /// Show the snapshot for this date instead of the live table
    #[arg(long, value_parser = parse_date)]
    pub(crate) period_date: Option<NaiveDate>,
    /// Show a specific run of the snapshot date
    #[arg(long)]
    pub(crate) run_id: Option<String>,
}

pub(crate) fn run_sync(args: SyncArgs) -> Result<(), AppError> {
    let portal = open_portal()?;
    println!("{}", sync_with(&portal, args)?);
    Ok(())
}

pub(crate) fn run_show(args: ShowArgs) -> Result<(), AppError> {
    let portal = open_portal()?;
    println!("{}", show_with(&portal, args)?);
    Ok(())
}

fn open_portal() -> Result<Portal, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;
    Portal::open(&config)
}

pub(crate) fn sync_with(portal: &Portal, args: SyncArgs) -> Result<String, AppError> {
    let report = portal.ranking.synchronize(SyncRequest {
        ranking_config_id: args.config,
        run_id: args.run_id,
        today: args.today,
    })?;
    Ok(render_report(&report))
}

pub(crate) fn show_with(portal: &Portal, args: ShowArgs) -> Result<String, AppError> {
    let board = portal.ranking.leaderboard(LeaderboardQuery {
        ranking_type: args.config,
        period_date: args.period_date,
        run_id: args.run_id,
    })?;
    Ok(render_leaderboard(&board))
}

fn render_report(report: &SyncReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Synchronized {} ranking config(s) for {} (run {})",
        report.config_ids.len(),
        report.period_date,
        report.run_id
    );
    let _ = writeln!(out, "  Configs: {}", display_list(&report.config_ids));
    let _ = writeln!(out, "  Ranking rows written: {}", report.updated_count);
    let _ = writeln!(out, "  Dimension scores written: {}", report.dimension_scores);
    let _ = write!(out, "  Stale rows removed: {}", report.removed_rows);
    out
}

fn render_leaderboard(board: &Leaderboard) -> String {
    let mut out = String::new();
    match board {
        Leaderboard::Current {
            ranking_type,
            entries,
        } => {
            let _ = writeln!(out, "Live leaderboard '{ranking_type}'");
            if entries.is_empty() {
                let _ = write!(out, "  (no entries)");
            }
            for entry in entries {
                let _ = writeln!(
                    out,
                    "  #{:<3} {:>4}  {} ({}) [{}]",
                    entry.position, entry.score, entry.app.name, entry.app.org, entry.tag
                );
            }
        }
        Leaderboard::Historical {
            ranking_type,
            period_date,
            run_id,
            entries,
        } => {
            let date = period_date.map_or_else(|| "no snapshots".to_string(), |d| d.to_string());
            let run = run_id.as_deref().unwrap_or("unassigned");
            let _ = writeln!(out, "Snapshot '{ranking_type}' {date} (run {run})");
            if entries.is_empty() {
                let _ = write!(out, "  (no entries)");
            }
            for entry in entries {
                let _ = writeln!(
                    out,
                    "  #{:<3} {:>4}  {} ({}) [{}]",
                    entry.position, entry.score, entry.app_name, entry.app_org, entry.tag
                );
            }
        }
    }
    out.trim_end().to_string()
}

fn display_list(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}
