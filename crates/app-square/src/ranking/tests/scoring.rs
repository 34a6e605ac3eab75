use super::common::{application, config, dimension, dimension_map};
use crate::directory::domain::{AppStatus, Difficulty, EffectivenessType};
use crate::ranking::scoring::{
    assess_application, score_application, score_dimension, ScoringRule, MAX_TOTAL_SCORE,
};

#[test]
fn satisfaction_and_business_value_blend_by_config_weight() {
    let app = application(1, 12.5);
    let dimensions = dimension_map(vec![dimension(1, "用户满意度"), dimension(2, "业务价值")]);
    let board = config("excellent", &[(1, 0.6), (2, 0.4)]);

    // 100 * 0.6 + 80 * 0.4
    assert_eq!(score_application(&app, &board, &dimensions, 1.0), 92);
}

#[test]
fn each_rule_reads_its_own_field() {
    let mut app = application(1, 3.0);
    app.difficulty = Difficulty::Medium;
    app.status = AppStatus::Beta;
    app.effectiveness_type = EffectivenessType::PerceptionUplift;

    let expectations = [
        ("用户满意度", 30),
        ("使用活跃度", 15),
        ("业务价值", 60),
        ("技术创新性", 70),
        ("稳定性和安全性", 80),
        ("响应速度", 50),
    ];
    for (name, expected) in expectations {
        let assessment = score_dimension(&app, &dimension(9, name));
        assert_eq!(assessment.score, expected, "dimension {name}");
        assert!(!assessment.detail.is_empty());
    }
}

#[test]
fn offline_and_pending_apps_score_sixty_on_stability() {
    let stability = dimension(5, "稳定性和安全性");
    for status in [AppStatus::Offline, AppStatus::Approval] {
        let mut app = application(1, 1.0);
        app.status = status;
        assert_eq!(score_dimension(&app, &stability).score, 60);
    }
}

#[test]
fn dangling_dimension_entries_are_skipped() {
    let app = application(1, 12.5);
    let dimensions = dimension_map(vec![dimension(1, "用户满意度")]);
    let board = config("excellent", &[(1, 0.5), (42, 3.0)]);

    let card = assess_application(&app, &board, &dimensions, 1.0);

    assert_eq!(card.total, 50);
    assert_eq!(card.components.len(), 1);
    assert_eq!(card.components[0].dimension_name, "用户满意度");
    assert_eq!(card.components[0].rule, "user_satisfaction");
}

#[test]
fn dimension_names_map_to_stable_rule_ids() {
    let mapping = [
        ("用户满意度", "user_satisfaction"),
        ("业务价值", "business_value"),
        ("技术创新性", "technical_innovation"),
        ("使用活跃度", "usage_activity"),
        ("稳定性和安全性", "stability_security"),
        ("用户满意度 ", "baseline"),
        ("响应速度", "baseline"),
    ];
    for (name, rule_id) in mapping {
        assert_eq!(
            ScoringRule::for_dimension_name(name).rule_id(),
            rule_id,
            "dimension {name:?}"
        );
    }
}

#[test]
fn weight_factor_scales_and_total_is_capped() {
    let app = application(1, 12.5);
    let dimensions = dimension_map(vec![dimension(1, "用户满意度")]);
    let board = config("excellent", &[(1, 5.0)]);

    assert_eq!(score_application(&app, &board, &dimensions, 0.5), 250);
    assert_eq!(
        score_application(&app, &board, &dimensions, 10.0),
        MAX_TOTAL_SCORE
    );
}

#[test]
fn non_positive_weight_factor_scores_zero() {
    let app = application(1, 12.5);
    let dimensions = dimension_map(vec![dimension(1, "用户满意度"), dimension(2, "业务价值")]);
    let board = config("excellent", &[(1, 0.6), (2, 0.4)]);

    assert_eq!(score_application(&app, &board, &dimensions, 0.0), 0);
    assert_eq!(score_application(&app, &board, &dimensions, -2.0), 0);
    assert_eq!(
        score_application(&app, &board, &dimensions, 1e300),
        MAX_TOTAL_SCORE
    );
}

#[test]
fn empty_config_scores_zero() {
    let app = application(1, 12.5);
    let dimensions = dimension_map(vec![dimension(1, "用户满意度")]);
    let card = assess_application(&app, &config("empty", &[]), &dimensions, 1.0);

    assert_eq!(card.total, 0);
    assert!(card.components.is_empty());
}

#[test]
fn renaming_a_dimension_switches_its_rule() {
    let app = application(1, 12.5);
    let mut renamed = dimension(1, "用户满意度");
    assert_eq!(score_dimension(&app, &renamed).score, 100);

    renamed.name = "用户满意度(新)".to_string();
    assert_eq!(score_dimension(&app, &renamed).score, 50);
}

#[test]
fn scoring_is_deterministic() {
    let app = application(3, 7.7);
    let dimensions = dimension_map(vec![
        dimension(1, "用户满意度"),
        dimension(2, "业务价值"),
        dimension(3, "技术创新性"),
    ]);
    let board = config("innovation", &[(1, 0.3), (2, 0.3), (3, 0.4)]);

    let first = assess_application(&app, &board, &dimensions, 1.2);
    let second = assess_application(&app, &board, &dimensions, 1.2);
    assert_eq!(first, second);
}
