use super::common::{application, config, date, dimension, dimension_map, participant, run};
use crate::directory::domain::{AppId, EffectivenessType};
use crate::ranking::domain::{SyncInputs, SyncScope, DEFAULT_TAG};
use crate::ranking::sync::{assign_positions, plan, resolve_tag, usage_30d, ScoredApp, SyncGuard};

fn scored(id: i64, score: u32) -> ScoredApp {
    ScoredApp {
        app_id: AppId(id),
        score,
    }
}

#[test]
fn ties_are_broken_by_ascending_app_id() {
    let ranked = assign_positions(vec![
        scored(1, 80),
        scored(2, 90),
        scored(3, 80),
        scored(4, 70),
        scored(5, 90),
    ]);

    let order: Vec<(u32, i64)> = ranked
        .iter()
        .map(|(position, entry)| (*position, entry.app_id.0))
        .collect();
    assert_eq!(order, vec![(1, 2), (2, 5), (3, 1), (4, 3), (5, 4)]);
}

#[test]
fn repeated_ordering_is_identical() {
    // a=1:300, b=2:500, c=3:500, d=4:450, e=5:300
    let board = || {
        vec![
            scored(1, 300),
            scored(2, 500),
            scored(3, 500),
            scored(4, 450),
            scored(5, 300),
        ]
    };
    let ids = |ranked: Vec<(u32, ScoredApp)>| -> Vec<i64> {
        ranked.into_iter().map(|(_, entry)| entry.app_id.0).collect()
    };

    let first = ids(assign_positions(board()));
    let mut reversed = board();
    reversed.reverse();
    let second = ids(assign_positions(reversed));

    assert_eq!(first, vec![2, 3, 4, 1, 5]);
    assert_eq!(first, second);
}

#[test]
fn plan_assigns_dense_positions_per_config() {
    let dimensions = dimension_map(vec![dimension(1, "用户满意度"), dimension(2, "业务价值")]);
    let inputs = SyncInputs {
        configs: vec![
            config("excellent", &[(1, 1.0)]),
            config("value", &[(2, 1.0)]),
        ],
        dimensions,
        participants: vec![
            participant(application(1, 2.0), "excellent", 1.0),
            participant(application(2, 9.0), "excellent", 1.0),
            participant(application(3, 5.0), "excellent", 1.0),
            participant(application(2, 9.0), "value", 1.0),
        ],
    };

    let plan = plan(&inputs, &run(date(2025, 3, 14)));

    let excellent: Vec<(u32, i64, u32)> = plan
        .standings
        .iter()
        .filter(|standing| standing.ranking_config_id == "excellent")
        .map(|standing| (standing.position, standing.app_id.0, standing.score))
        .collect();
    assert_eq!(excellent, vec![(1, 2, 90), (2, 3, 50), (3, 1, 20)]);

    let value: Vec<i64> = plan.participants_of("value").map(|id| id.0).collect();
    assert_eq!(value, vec![2]);
    assert_eq!(plan.config_ids, vec!["excellent".to_string(), "value".to_string()]);
}

#[test]
fn standings_carry_derived_presentation_fields() {
    let mut app = application(7, 3.4567);
    app.effectiveness_type = EffectivenessType::CostReduction;
    let inputs = SyncInputs {
        configs: vec![config("excellent", &[(1, 1.0)])],
        dimensions: dimension_map(vec![dimension(1, "业务价值")]),
        participants: vec![participant(app, "excellent", 1.0)],
    };

    let plan = plan(&inputs, &run(date(2025, 3, 14)));
    let standing = &plan.standings[0];

    assert_eq!(standing.metric_type, "composite");
    assert_eq!(standing.value_dimension, "cost_reduction");
    assert_eq!(standing.usage_30d, 3456);
    assert_eq!(standing.tag, DEFAULT_TAG);
    assert_eq!(standing.score, 70);
}

#[test]
fn last_config_supplies_the_recorded_dimension_weight() {
    let inputs = SyncInputs {
        configs: vec![
            config("alpha", &[(1, 0.5)]),
            config("beta", &[(1, 2.0)]),
        ],
        dimensions: dimension_map(vec![dimension(1, "用户满意度")]),
        participants: vec![
            participant(application(1, 4.0), "alpha", 1.0),
            participant(application(1, 4.0), "beta", 1.0),
        ],
    };

    let plan = plan(&inputs, &run(date(2025, 3, 14)));

    assert_eq!(plan.dimension_scores.len(), 1);
    let recorded = &plan.dimension_scores[0];
    assert_eq!(recorded.score, 40);
    assert_eq!(recorded.weight, 2.0);
    assert_eq!(recorded.period_date, date(2025, 3, 14));
}

#[test]
fn config_without_participants_yields_no_standings() {
    let inputs = SyncInputs {
        configs: vec![config("empty", &[(1, 1.0)])],
        dimensions: dimension_map(vec![dimension(1, "用户满意度")]),
        participants: Vec::new(),
    };

    let plan = plan(&inputs, &run(date(2025, 3, 14)));

    assert!(plan.standings.is_empty());
    assert!(plan.dimension_scores.is_empty());
    assert_eq!(plan.config_ids, vec!["empty".to_string()]);
}

#[test]
fn custom_tag_beats_app_tag_beats_default() {
    let mut entry = participant(application(1, 1.0), "excellent", 1.0);
    assert_eq!(resolve_tag(&entry.setting, &entry.app), DEFAULT_TAG);

    entry.app.ranking_tags = "效率".to_string();
    assert_eq!(resolve_tag(&entry.setting, &entry.app), "效率");

    entry.setting.custom_tags = "  新星 ".to_string();
    assert_eq!(resolve_tag(&entry.setting, &entry.app), "新星");

    entry.setting.custom_tags = "   ".to_string();
    assert_eq!(resolve_tag(&entry.setting, &entry.app), "效率");
}

#[test]
fn usage_is_truncated_thousands_of_calls() {
    assert_eq!(usage_30d(12.5), 12_500);
    assert_eq!(usage_30d(0.0009), 0);
    assert_eq!(usage_30d(f64::INFINITY), 0);
}

#[test]
fn guard_rejects_overlapping_scopes_until_released() {
    let guard = SyncGuard::new();
    let excellent = SyncScope::Config("excellent".to_string());
    let value = SyncScope::Config("value".to_string());

    let permit = guard.acquire(&excellent).expect("first run");
    assert!(guard.is_running(&excellent));
    assert!(guard.acquire(&excellent).is_err());
    assert!(guard.acquire(&SyncScope::All).is_err());

    let other = guard.acquire(&value).expect("disjoint config");
    drop(other);
    drop(permit);

    assert!(!guard.is_running(&excellent));
    let all = guard.acquire(&SyncScope::All).expect("nothing running");
    let busy = guard.acquire(&value).expect_err("all configs running");
    assert_eq!(busy.0, value);
    drop(all);
}
