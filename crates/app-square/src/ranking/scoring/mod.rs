//! Pure scoring of applications against dimensions and ranking configs.

mod rules;

pub use rules::{DimensionAssessment, ScoringRule};

use serde::Serialize;

use super::domain::{Dimension, DimensionId, DimensionMap, RankingConfig};
use crate::directory::domain::Application;

/// Upper bound of a composite leaderboard score.
pub const MAX_TOTAL_SCORE: u32 = 1000;

/// One weighted dimension contribution, kept for audits and dimension-score rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub dimension_id: DimensionId,
    pub dimension_name: String,
    /// Stable id of the rule the dimension name resolved to.
    pub rule: &'static str,
    pub score: u8,
    pub weight: f64,
    pub detail: String,
}

/// Composite score with the contributions that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub total: u32,
    pub components: Vec<ScoreComponent>,
}

pub fn score_dimension(app: &Application, dimension: &Dimension) -> DimensionAssessment {
    ScoringRule::for_dimension_name(&dimension.name).evaluate(app)
}

/// Weighted sum over the config's dimension list, scaled by the participation's
/// `weight_factor`, truncated and clamped to `[0, MAX_TOTAL_SCORE]`.
/// Entries referencing dimensions absent from `dimensions` are skipped.
pub fn assess_application(
    app: &Application,
    config: &RankingConfig,
    dimensions: &DimensionMap,
    weight_factor: f64,
) -> ScoreCard {
    let mut weighted = 0.0_f64;
    let mut components = Vec::with_capacity(config.dimensions.len());

    for entry in &config.dimensions {
        let Some(dimension) = dimensions.get(&entry.dimension_id) else {
            continue;
        };
        let rule = ScoringRule::for_dimension_name(&dimension.name);
        let assessment = rule.evaluate(app);
        weighted += f64::from(assessment.score) * entry.weight;
        components.push(ScoreComponent {
            dimension_id: dimension.id,
            dimension_name: dimension.name.clone(),
            rule: rule.rule_id(),
            score: assessment.score,
            weight: entry.weight,
            detail: assessment.detail,
        });
    }

    ScoreCard {
        total: clamp_total(weighted * weight_factor),
        components,
    }
}

pub fn score_application(
    app: &Application,
    config: &RankingConfig,
    dimensions: &DimensionMap,
    weight_factor: f64,
) -> u32 {
    assess_application(app, config, dimensions, weight_factor).total
}

fn clamp_total(raw: f64) -> u32 {
    let truncated = raw.trunc();
    if truncated.is_nan() || truncated <= 0.0 {
        0
    } else if truncated >= f64::from(MAX_TOTAL_SCORE) {
        MAX_TOTAL_SCORE
    } else {
        truncated as u32
    }
}
