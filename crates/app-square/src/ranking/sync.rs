//! Leaderboard synchronization: the pure planning step plus the in-process run guard.
//!
//! The planner turns a snapshot of configs, dimensions, and participants into the full set
//! of rows a run writes. Persisting the plan (and loading the snapshot) happens inside one
//! store transaction; see [`super::repository::RankingRepository::synchronize`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};

use super::domain::{
    DimensionId, DimensionScore, Participant, RunContext, Standing, SyncInputs, SyncPlan,
    SyncScope, DEFAULT_TAG,
};
use super::scoring::assess_application;
use crate::directory::domain::{AppId, Application};
use crate::ranking::domain::ParticipationSetting;

/// Score/identity pair used for leaderboard ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredApp {
    pub app_id: AppId,
    pub score: u32,
}

/// Descending score, ties broken by ascending application id.
pub fn leaderboard_order(a: &ScoredApp, b: &ScoredApp) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.app_id.cmp(&b.app_id))
}

/// Sort and assign dense 1-based positions.
pub fn assign_positions(mut scored: Vec<ScoredApp>) -> Vec<(u32, ScoredApp)> {
    scored.sort_by(leaderboard_order);
    scored
        .into_iter()
        .enumerate()
        .map(|(index, entry)| (index as u32 + 1, entry))
        .collect()
}

/// Participation override, then the app's own tags, then [`DEFAULT_TAG`].
pub fn resolve_tag(setting: &ParticipationSetting, app: &Application) -> String {
    [setting.custom_tags.trim(), app.ranking_tags.trim()]
        .into_iter()
        .find(|tag| !tag.is_empty())
        .unwrap_or(DEFAULT_TAG)
        .to_string()
}

/// Derived 30-day usage figure shown on leaderboards.
pub fn usage_30d(monthly_calls: f64) -> i64 {
    let scaled = (monthly_calls * 1000.0).trunc();
    if scaled.is_finite() {
        scaled as i64
    } else {
        0
    }
}

/// Compute every row a run writes. Configs and participants are processed in input order,
/// which the store supplies sorted by config id and app id; when an app is scored by more
/// than one config, the last config's weight is the one recorded on its dimension scores.
pub fn plan(inputs: &SyncInputs, run: &RunContext) -> SyncPlan {
    let mut dimension_scores: BTreeMap<(AppId, DimensionId), DimensionScore> = BTreeMap::new();
    let mut standings = Vec::new();

    for config in &inputs.configs {
        let participants: Vec<&Participant> = inputs
            .participants
            .iter()
            .filter(|participant| participant.setting.ranking_config_id == config.id)
            .collect();

        let mut by_app: BTreeMap<AppId, &Participant> = BTreeMap::new();
        let mut scored = Vec::with_capacity(participants.len());

        for participant in participants {
            let card = assess_application(
                &participant.app,
                config,
                &inputs.dimensions,
                participant.setting.weight_factor,
            );
            for component in card.components {
                dimension_scores.insert(
                    (participant.app.id, component.dimension_id),
                    DimensionScore {
                        app_id: participant.app.id,
                        dimension_id: component.dimension_id,
                        dimension_name: component.dimension_name,
                        score: component.score,
                        weight: component.weight,
                        calculation_detail: component.detail,
                        period_date: run.period_date,
                    },
                );
            }
            scored.push(ScoredApp {
                app_id: participant.app.id,
                score: card.total,
            });
            by_app.insert(participant.app.id, participant);
        }

        for (position, entry) in assign_positions(scored) {
            let Some(participant) = by_app.get(&entry.app_id) else {
                continue;
            };
            standings.push(Standing {
                ranking_config_id: config.id.clone(),
                position,
                app_id: entry.app_id,
                tag: resolve_tag(&participant.setting, &participant.app),
                score: entry.score,
                metric_type: config.calculation_method.clone(),
                value_dimension: participant.app.effectiveness_type.label().to_string(),
                usage_30d: usage_30d(participant.app.monthly_calls),
            });
        }
    }

    SyncPlan {
        run: run.clone(),
        config_ids: inputs.configs.iter().map(|config| config.id.clone()).collect(),
        dimension_scores: dimension_scores.into_values().collect(),
        standings,
    }
}

/// Rejects a sync whose scope overlaps a run already in progress in this process.
#[derive(Debug, Default)]
pub struct SyncGuard {
    running: Mutex<HashSet<SyncScope>>,
}

/// Raised when a sync overlaps a run already in progress.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a synchronization covering {0} is already running")]
pub struct SyncBusy(pub SyncScope);

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, scope: &SyncScope) -> Result<SyncPermit<'_>, SyncBusy> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let overlaps = match scope {
            SyncScope::All => !running.is_empty(),
            SyncScope::Config(_) => running.contains(&SyncScope::All) || running.contains(scope),
        };
        if overlaps {
            return Err(SyncBusy(scope.clone()));
        }
        running.insert(scope.clone());
        Ok(SyncPermit {
            guard: self,
            scope: scope.clone(),
        })
    }

    pub fn is_running(&self, scope: &SyncScope) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(scope)
    }
}

/// Releases its scope when dropped.
#[derive(Debug)]
pub struct SyncPermit<'a> {
    guard: &'a SyncGuard,
    scope: SyncScope,
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.guard
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.scope);
    }
}
