use crate::directory::domain::{AppStatus, Application, Difficulty, EffectivenessType};

/// Score and audit note produced for one (application, dimension) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionAssessment {
    pub score: u8,
    pub detail: String,
}

/// The fixed catalog of scoring rules.
///
/// Rules are selected by the dimension's display name, so renaming a dimension silently
/// switches it to a different rule (usually [`ScoringRule::Baseline`]). The lookup is kept
/// in [`RULE_TABLE`] so the key can move to a stable rule id without touching the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringRule {
    UserSatisfaction,
    BusinessValue,
    TechnicalInnovation,
    UsageActivity,
    StabilityAndSecurity,
    Baseline,
}

const RULE_TABLE: [(&str, ScoringRule); 5] = [
    ("用户满意度", ScoringRule::UserSatisfaction),
    ("业务价值", ScoringRule::BusinessValue),
    ("技术创新性", ScoringRule::TechnicalInnovation),
    ("使用活跃度", ScoringRule::UsageActivity),
    ("稳定性和安全性", ScoringRule::StabilityAndSecurity),
];

const BASELINE_SCORE: u8 = 50;

impl ScoringRule {
    /// Exact, case-sensitive match on the dimension name; anything else is the baseline.
    pub fn for_dimension_name(name: &str) -> Self {
        RULE_TABLE
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, rule)| *rule)
            .unwrap_or(ScoringRule::Baseline)
    }

    /// Stable identifier for the rule, independent of any dimension name.
    pub const fn rule_id(self) -> &'static str {
        match self {
            ScoringRule::UserSatisfaction => "user_satisfaction",
            ScoringRule::BusinessValue => "business_value",
            ScoringRule::TechnicalInnovation => "technical_innovation",
            ScoringRule::UsageActivity => "usage_activity",
            ScoringRule::StabilityAndSecurity => "stability_security",
            ScoringRule::Baseline => "baseline",
        }
    }

    pub fn evaluate(self, app: &Application) -> DimensionAssessment {
        match self {
            ScoringRule::UserSatisfaction => {
                let score = call_volume_score(app.monthly_calls, 10.0);
                DimensionAssessment {
                    score,
                    detail: format!(
                        "monthly calls {} x 10 = {score} (capped at 100)",
                        app.monthly_calls
                    ),
                }
            }
            ScoringRule::UsageActivity => {
                let score = call_volume_score(app.monthly_calls, 5.0);
                DimensionAssessment {
                    score,
                    detail: format!(
                        "monthly calls {} x 5 = {score} (capped at 100)",
                        app.monthly_calls
                    ),
                }
            }
            ScoringRule::BusinessValue => {
                let score = match app.effectiveness_type {
                    EffectivenessType::RevenueGrowth => 100,
                    EffectivenessType::EfficiencyGain => 80,
                    EffectivenessType::CostReduction => 70,
                    EffectivenessType::PerceptionUplift => 60,
                };
                DimensionAssessment {
                    score,
                    detail: format!(
                        "effectiveness type {} scores {score}",
                        app.effectiveness_type.label()
                    ),
                }
            }
            ScoringRule::TechnicalInnovation => {
                let score = match app.difficulty {
                    Difficulty::High => 100,
                    Difficulty::Medium => 70,
                    Difficulty::Low => 40,
                };
                DimensionAssessment {
                    score,
                    detail: format!("difficulty {} scores {score}", app.difficulty.label()),
                }
            }
            ScoringRule::StabilityAndSecurity => {
                let score = match app.status {
                    AppStatus::Available => 100,
                    AppStatus::Beta => 80,
                    AppStatus::Approval | AppStatus::Offline => 60,
                };
                DimensionAssessment {
                    score,
                    detail: format!("status {} scores {score}", app.status.label()),
                }
            }
            ScoringRule::Baseline => DimensionAssessment {
                score: BASELINE_SCORE,
                detail: format!("no rule for this dimension, baseline {BASELINE_SCORE}"),
            },
        }
    }
}

/// `round(calls * factor)` clamped to [0, 100]; halves round away from zero.
fn call_volume_score(monthly_calls: f64, factor: f64) -> u8 {
    let scaled = (monthly_calls * factor).round();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else if scaled >= 100.0 {
        100
    } else {
        scaled as u8
    }
}
