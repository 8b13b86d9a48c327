/// Integration tests for penalties issued on verification
/// Tests escalation per severity, penalty targets and suspension lookups
mod common;

use chrono::{Duration, Utc};
use common::{database::*, fixtures::*};
use ruforo_moderation::moderation::penalty::Suspension;
use ruforo_moderation::orm::moderated_objects::ObjectType;
use ruforo_moderation::orm::moderation_categories::{self, Severity};
use ruforo_moderation::orm::moderation_penalties::{self, PenaltyType};
use ruforo_moderation::{Moderation, ModerationError};
use sea_orm::{entity::*, ActiveValue::Set, ConnectionTrait, Statement};

/// Report, approve and verify a post. Returns the durations issued, in seconds.
async fn punish_post(
    moderation: &Moderation,
    post_id: i32,
    category: &moderation_categories::Model,
) -> Vec<Option<i64>> {
    let report = moderation
        .create_report(new_report(ObjectType::Post, post_id, 99, category.id))
        .await
        .expect("Failed to create report");
    moderation
        .approve(report.moderated_object_id, Some(1))
        .await
        .expect("Failed to approve");
    let verification = moderation
        .verify(report.moderated_object_id, Some(1))
        .await
        .expect("Failed to verify");

    verification
        .issued()
        .map(|penalty| penalty.duration_seconds)
        .collect()
}

#[actix_rt::test]
async fn test_high_severity_escalates_to_sixteen_days() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let violence = create_test_category(&moderation, "violence", Severity::High).await;
    for post_id in 1..=3 {
        store.add_post(post_id, 10, None);
    }

    assert_eq!(punish_post(&moderation, 1, &violence).await, vec![Some(0)]);
    assert_eq!(
        punish_post(&moderation, 2, &violence).await,
        vec![Some(Duration::days(1).num_seconds())]
    );
    assert_eq!(
        moderation
            .count_penalties_at_severity(10, Severity::High)
            .await
            .unwrap(),
        2
    );

    assert_eq!(
        punish_post(&moderation, 3, &violence).await,
        vec![Some(Duration::days(16).num_seconds())]
    );
}

#[actix_rt::test]
async fn test_medium_severity_escalates_to_nine_hours() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let copyright = create_test_category(&moderation, "copyright", Severity::Medium).await;
    for post_id in 1..=4 {
        store.add_post(post_id, 10, None);
    }

    for post_id in 1..=3 {
        punish_post(&moderation, post_id, &copyright).await;
    }

    let durations = punish_post(&moderation, 4, &copyright).await;
    assert_eq!(durations, vec![Some(Duration::hours(9).num_seconds())]);
}

#[actix_rt::test]
async fn test_severities_are_counted_separately() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let spam = create_test_category(&moderation, "spam", Severity::Low).await;
    let violence = create_test_category(&moderation, "violence", Severity::High).await;
    for post_id in 1..=3 {
        store.add_post(post_id, 10, None);
    }

    punish_post(&moderation, 1, &spam).await;
    punish_post(&moderation, 2, &spam).await;

    // Two low penalties do not count towards high
    assert_eq!(punish_post(&moderation, 3, &violence).await, vec![Some(0)]);
    assert_eq!(
        moderation
            .count_penalties_at_severity(10, Severity::Low)
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        moderation
            .count_penalties_at_severity(10, Severity::High)
            .await
            .unwrap(),
        1
    );
    assert_eq!(moderation.penalties_for_user(10).await.unwrap().len(), 3);
}

#[actix_rt::test]
async fn test_reverify_does_not_count_own_penalties() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let violence = create_test_category(&moderation, "violence", Severity::High).await;
    store.add_post(1, 10, None);
    store.add_post(2, 10, None);

    punish_post(&moderation, 1, &violence).await;
    let report = moderation
        .create_report(new_report(ObjectType::Post, 2, 99, violence.id))
        .await
        .unwrap();
    let id = report.moderated_object_id;
    moderation.approve(id, Some(1)).await.unwrap();

    let first = moderation.verify(id, Some(1)).await.unwrap();
    let second = moderation.verify(id, Some(1)).await.unwrap();

    let first: Vec<_> = first.issued().map(|p| p.duration_seconds).collect();
    let second: Vec<_> = second.issued().map(|p| p.duration_seconds).collect();
    assert_eq!(first, vec![Some(Duration::days(1).num_seconds())]);
    assert_eq!(first, second);
    assert_eq!(moderation.penalties(id).await.unwrap().len(), 2);
}

#[actix_rt::test]
async fn test_critical_severity_is_reported_per_target() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let child_abuse = create_test_category(&moderation, "child_abuse", Severity::Critical).await;
    store.add_post(1, 10, None);

    let report = moderation
        .create_report(new_report(ObjectType::Post, 1, 99, child_abuse.id))
        .await
        .unwrap();
    moderation
        .approve(report.moderated_object_id, Some(1))
        .await
        .unwrap();
    let verification = moderation
        .verify(report.moderated_object_id, Some(1))
        .await
        .expect("Verification itself should succeed");

    assert!(verification.moderated_object.is_verified());
    assert_eq!(verification.penalties.len(), 1);
    let failures: Vec<_> = verification.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 10);
    assert!(matches!(
        failures[0].1,
        ModerationError::UnhandledSeverityPolicy(Severity::Critical)
    ));
    assert!(moderation
        .penalties(report.moderated_object_id)
        .await
        .unwrap()
        .is_empty());
}

#[actix_rt::test]
async fn test_community_staff_are_all_penalised() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let hatred = create_test_category(&moderation, "hatred_bullying", Severity::High).await;
    store.add_community(7, 10, &[10, 11, 12]);

    let report = moderation
        .create_report(new_report(ObjectType::Community, 7, 99, hatred.id))
        .await
        .unwrap();
    moderation
        .approve(report.moderated_object_id, Some(1))
        .await
        .unwrap();
    let verification = moderation
        .verify(report.moderated_object_id, Some(1))
        .await
        .unwrap();

    let targets: Vec<i32> = verification.penalties.iter().map(|o| o.user_id).collect();
    assert_eq!(targets, vec![10, 11, 12]);
    assert_eq!(verification.issued().count(), 3);
    assert!(verification
        .issued()
        .all(|p| p.penalty_type == PenaltyType::Suspension
            && p.moderated_object_id == report.moderated_object_id));
}

#[actix_rt::test]
async fn test_user_and_comment_targets() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let spam = create_test_category(&moderation, "spam", Severity::Low).await;
    store.add_user(40);
    store.add_post(1, 10, None);
    store.add_comment(2, 41, 1);

    for (object_type, object_id, expected) in
        [(ObjectType::User, 40, 40), (ObjectType::PostComment, 2, 41)]
    {
        let report = moderation
            .create_report(new_report(object_type, object_id, 99, spam.id))
            .await
            .unwrap();
        moderation
            .approve(report.moderated_object_id, Some(1))
            .await
            .unwrap();
        let verification = moderation
            .verify(report.moderated_object_id, Some(1))
            .await
            .unwrap();
        let targets: Vec<i32> = verification.issued().map(|p| p.user_id).collect();
        assert_eq!(targets, vec![expected]);
    }
}

#[actix_rt::test]
async fn test_meta_report_penalises_earlier_reporters() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let spam = create_test_category(&moderation, "spam", Severity::Low).await;
    store.add_post(1, 10, None);

    let first = moderation
        .create_report(new_report(ObjectType::Post, 1, 20, spam.id))
        .await
        .unwrap();
    moderation
        .create_report(new_report(ObjectType::Post, 1, 21, spam.id))
        .await
        .unwrap();

    // Someone reports the bogus reports themselves
    let meta = moderation
        .create_report(new_report(
            ObjectType::ModeratedObject,
            first.moderated_object_id,
            30,
            spam.id,
        ))
        .await
        .unwrap();
    assert_ne!(meta.moderated_object_id, first.moderated_object_id);

    moderation
        .approve(meta.moderated_object_id, Some(1))
        .await
        .unwrap();
    let verification = moderation
        .verify(meta.moderated_object_id, Some(1))
        .await
        .unwrap();

    let mut targets: Vec<i32> = verification.issued().map(|p| p.user_id).collect();
    targets.sort_unstable();
    assert_eq!(targets, vec![20, 21]);
}

#[actix_rt::test]
async fn test_active_suspension() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let violence = create_test_category(&moderation, "violence", Severity::High).await;
    store.add_post(1, 10, None);
    store.add_post(2, 10, None);

    assert_eq!(moderation.active_suspension(10).await.unwrap(), None);

    // First offence is zero length and already over
    punish_post(&moderation, 1, &violence).await;
    assert_eq!(moderation.active_suspension(10).await.unwrap(), None);

    punish_post(&moderation, 2, &violence).await;
    match moderation.active_suspension(10).await.unwrap() {
        Some(Suspension::Until(end)) => {
            let remaining = end - Utc::now().naive_utc();
            assert!(remaining > Duration::hours(23));
            assert!(remaining <= Duration::days(1));
        }
        other => panic!("Expected a timed suspension, got {:?}", other),
    }

    // A penalty without a duration never ends
    let moderated_object = moderation
        .find_for_content(ObjectType::Post, 1)
        .await
        .unwrap()
        .expect("Post 1 was reported");
    moderation_penalties::ActiveModel {
        user_id: Set(10),
        moderated_object_id: Set(moderated_object.id),
        penalty_type: Set(PenaltyType::Suspension),
        duration_seconds: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(moderation.db())
    .await
    .unwrap();

    assert_eq!(
        moderation.active_suspension(10).await.unwrap(),
        Some(Suspension::Permanent)
    );
}

#[actix_rt::test]
async fn test_failed_target_does_not_block_other_targets() {
    init_logging();
    let db = setup_test_database()
        .await
        .expect("Failed to setup test database");
    let (moderation, store) = create_test_moderation(db);
    let hatred = create_test_category(&moderation, "hatred_bullying", Severity::High).await;
    store.add_community(7, 10, &[10, 11, 12]);

    let report = moderation
        .create_report(new_report(ObjectType::Community, 7, 99, hatred.id))
        .await
        .unwrap();
    moderation
        .approve(report.moderated_object_id, Some(1))
        .await
        .unwrap();

    // Penalty writes for user 11 fail at the database
    moderation
        .db()
        .execute(Statement::from_string(
            moderation.db().get_database_backend(),
            "CREATE TRIGGER reject_penalty_for_user_11
                BEFORE INSERT ON moderation_penalties
                WHEN NEW.user_id = 11
                BEGIN SELECT RAISE(ABORT, 'penalty rejected'); END"
                .to_string(),
        ))
        .await
        .expect("Failed to create trigger");

    let verification = moderation
        .verify(report.moderated_object_id, Some(1))
        .await
        .expect("Verification itself should succeed");

    let outcomes: Vec<(i32, bool)> = verification
        .penalties
        .iter()
        .map(|o| (o.user_id, o.is_issued()))
        .collect();
    assert_eq!(outcomes, vec![(10, true), (11, false), (12, true)]);

    let failures: Vec<_> = verification.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 11);
    assert!(matches!(
        failures[0].1,
        ModerationError::PersistenceFailure(_)
    ));

    let mut persisted: Vec<i32> = moderation
        .penalties(report.moderated_object_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.user_id)
        .collect();
    persisted.sort_unstable();
    assert_eq!(persisted, vec![10, 12]);
    assert!(moderation.get(report.moderated_object_id).await.unwrap().is_verified());
}
