use super::common::{draft, seed_config, service, store, today};
use crate::directory::domain::{
    AppFilter, AppId, AppStatus, DataLevel, EffectivenessType, RankingParamsUpdate, Section,
    SubmissionId, SubmissionStatus,
};
use crate::directory::DirectoryServiceError;

fn validation_field(err: DirectoryServiceError) -> &'static str {
    match err {
        DirectoryServiceError::Validation(validation) => validation.field,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn submissions_are_validated_field_by_field() {
    let store = store();
    let service = service(&store);

    let mut short_name = draft();
    short_name.app_name = " 助 ".to_string();
    assert_eq!(
        validation_field(service.create_submission(short_name).expect_err("short name")),
        "app_name"
    );

    let mut brief = draft();
    brief.scenario = "太短了".to_string();
    assert_eq!(
        validation_field(service.create_submission(brief).expect_err("short scenario")),
        "scenario"
    );

    let mut unknown_type = draft();
    unknown_type.effectiveness_type = "growth_hacking".to_string();
    assert_eq!(
        validation_field(service.create_submission(unknown_type).expect_err("bad type")),
        "effectiveness_type"
    );

    let mut unknown_level = draft();
    unknown_level.data_level = "L9".to_string();
    assert_eq!(
        validation_field(service.create_submission(unknown_level).expect_err("bad level")),
        "data_level"
    );

    let mut heavy = draft();
    heavy.ranking_weight = 11.0;
    assert_eq!(
        validation_field(service.create_submission(heavy).expect_err("heavy weight")),
        "ranking_weight"
    );

    assert!(service.list_submissions(None).expect("list").is_empty());
}

#[test]
fn new_submissions_start_pending_with_parsed_enums() {
    let store = store();
    let service = service(&store);

    let submission = service.create_submission(draft()).expect("create");

    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(submission.effectiveness_type, EffectivenessType::RevenueGrowth);
    assert_eq!(submission.data_level, DataLevel::L2);
    assert_eq!(submission.category, "办公类");
    assert!(submission.ranking_enabled);
    assert_eq!(
        service.get_submission(submission.id).expect("fetch"),
        submission
    );
    assert!(matches!(
        service.get_submission(SubmissionId(404)),
        Err(DirectoryServiceError::NotFound(_))
    ));
}

#[test]
fn approval_creates_a_province_app_with_disabled_settings() {
    let store = store();
    seed_config(&store, "excellent", true);
    seed_config(&store, "innovation", true);
    seed_config(&store, "retired", false);
    let service = service(&store);
    let submission = service.create_submission(draft()).expect("create");

    let approval = service
        .approve_submission(submission.id, Some(today()))
        .expect("approve");

    assert_eq!(approval.submission.status, SubmissionStatus::Approved);
    let app = &approval.app;
    assert_eq!(app.name, "合同智能审查");
    assert_eq!(app.org, "法律事务部");
    assert_eq!(app.section, Section::Province);
    assert_eq!(app.status, AppStatus::Available);
    assert_eq!(app.monthly_calls, 0.0);
    assert_eq!(app.release_date, today());
    assert_eq!(app.ranking_tags, "风控");

    let configs: Vec<&str> = approval
        .ranking_settings
        .iter()
        .map(|setting| setting.ranking_config_id.as_str())
        .collect();
    assert_eq!(configs, vec!["excellent", "innovation"]);
    assert!(approval
        .ranking_settings
        .iter()
        .all(|setting| !setting.is_enabled && setting.weight_factor == 1.0));

    assert_eq!(service.get_app(app.id).expect("listed"), approval.app);
}

#[test]
fn only_pending_submissions_can_be_resolved() {
    let store = store();
    let service = service(&store);
    let approved = service.create_submission(draft()).expect("create");
    let rejected = service.create_submission(draft()).expect("create");

    service
        .approve_submission(approved.id, Some(today()))
        .expect("approve");
    let outcome = service.reject_submission(rejected.id).expect("reject");
    assert_eq!(outcome.status, SubmissionStatus::Rejected);

    assert!(matches!(
        service.approve_submission(approved.id, Some(today())),
        Err(DirectoryServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.reject_submission(approved.id),
        Err(DirectoryServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.approve_submission(rejected.id, Some(today())),
        Err(DirectoryServiceError::Conflict(_))
    ));
    assert!(matches!(
        service.reject_submission(SubmissionId(404)),
        Err(DirectoryServiceError::NotFound(_))
    ));

    assert_eq!(service.list_apps(AppFilter::default()).expect("apps").len(), 1);
    let pending = service
        .list_submissions(Some(SubmissionStatus::Pending))
        .expect("pending");
    assert!(pending.is_empty());
    assert_eq!(service.list_submissions(None).expect("all").len(), 2);
}

#[test]
fn listing_filters_by_category_and_text() {
    let store = store();
    let service = service(&store);
    let mut names = Vec::new();
    for (name, category) in [("合同智能审查", "办公类"), ("智能客服", "客服类"), ("100%_覆盖", "办公类")] {
        let mut submission = draft();
        submission.app_name = name.to_string();
        submission.category = category.to_string();
        let created = service.create_submission(submission).expect("create");
        let approval = service
            .approve_submission(created.id, Some(today()))
            .expect("approve");
        names.push(approval.app.id);
    }

    let everything = service
        .list_apps(AppFilter {
            category: Some("全部".to_string()),
            ..AppFilter::default()
        })
        .expect("all categories");
    assert_eq!(everything.len(), 3);

    let office = service
        .list_apps(AppFilter {
            category: Some("办公类".to_string()),
            ..AppFilter::default()
        })
        .expect("office");
    assert_eq!(office.len(), 2);

    let search = service
        .list_apps(AppFilter {
            query: Some(" 客服 ".to_string()),
            ..AppFilter::default()
        })
        .expect("search");
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].id, names[1]);

    let literal = service
        .list_apps(AppFilter {
            query: Some("%_".to_string()),
            ..AppFilter::default()
        })
        .expect("literal wildcard");
    assert_eq!(literal.len(), 1);
    assert_eq!(literal[0].id, names[2]);

    let group = service
        .list_apps(AppFilter {
            section: Some(Section::Group),
            ..AppFilter::default()
        })
        .expect("group");
    assert!(group.is_empty());
}

#[test]
fn ranking_params_update_is_all_or_nothing() {
    let store = store();
    let service = service(&store);
    let submission = service.create_submission(draft()).expect("create");
    let app = service
        .approve_submission(submission.id, Some(today()))
        .expect("approve")
        .app;

    let err = service
        .update_ranking_params(RankingParamsUpdate {
            app_ids: vec![app.id, AppId(999)],
            ranking_enabled: Some(false),
            ranking_weight: None,
            ranking_tags: None,
        })
        .expect_err("unknown app");
    assert!(matches!(err, DirectoryServiceError::Repository(_)));
    assert!(service.get_app(app.id).expect("app").ranking_enabled);

    let updated = service
        .update_ranking_params(RankingParamsUpdate {
            app_ids: vec![app.id],
            ranking_enabled: None,
            ranking_weight: Some(2.5),
            ranking_tags: Some("标杆".to_string()),
        })
        .expect("update");
    assert_eq!(updated, 1);
    let app = service.get_app(app.id).expect("app");
    assert_eq!(app.ranking_weight, 2.5);
    assert_eq!(app.ranking_tags, "标杆");
    assert!(app.ranking_enabled);
}

#[test]
fn ranking_params_update_needs_targets_and_fields() {
    let store = store();
    let service = service(&store);

    let no_targets = service.update_ranking_params(RankingParamsUpdate {
        app_ids: Vec::new(),
        ranking_enabled: Some(true),
        ranking_weight: None,
        ranking_tags: None,
    });
    assert_eq!(
        validation_field(no_targets.expect_err("no ids")),
        "app_ids"
    );

    let no_fields = service.update_ranking_params(RankingParamsUpdate {
        app_ids: vec![AppId(1)],
        ranking_enabled: None,
        ranking_weight: None,
        ranking_tags: None,
    });
    assert_eq!(
        validation_field(no_fields.expect_err("no fields")),
        "ranking_params"
    );

    let light = service.update_ranking_params(RankingParamsUpdate {
        app_ids: vec![AppId(1)],
        ranking_enabled: None,
        ranking_weight: Some(0.05),
        ranking_tags: None,
    });
    assert_eq!(validation_field(light.expect_err("light")), "ranking_weight");
}
