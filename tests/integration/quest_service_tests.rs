use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use questforge_app_lib::db::DbPool;
use questforge_app_lib::error::AppError;
use questforge_app_lib::models::quest::{Difficulty, QuestCreateInput, QuestUpdateInput};
use questforge_app_lib::services::progression_engine::ProgressionEngine;
use questforge_app_lib::services::quest_service::QuestService;
use questforge_app_lib::services::user_service::UserService;
use questforge_app_lib::utils::clock::FixedClock;
use tempfile::{tempdir, TempDir};

struct Harness {
    _dir: TempDir,
    clock: FixedClock,
    quests: QuestService,
    owner: String,
    stranger: String,
}

fn setup() -> Harness {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("quests.sqlite")).expect("db pool");
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 5, 10, 0, 0).unwrap());
    let engine = ProgressionEngine::default();
    let users = UserService::new(pool.clone(), Arc::new(clock.clone()), engine);
    let quests = QuestService::new(pool, Arc::new(clock.clone()), engine);
    let owner = users.register("owner", "secret1").expect("owner").id;
    let stranger = users.register("stranger", "secret2").expect("stranger").id;

    Harness {
        _dir: dir,
        clock,
        quests,
        owner,
        stranger,
    }
}

#[test]
fn create_update_and_delete_quest() {
    let harness = setup();

    let created = harness
        .quests
        .create_quest(
            &harness.owner,
            QuestCreateInput {
                name: "  Learn Rust  ".into(),
                description: Some("Finish the ownership chapter".into()),
                tags: Some(vec!["Study".into(), "study".into(), " focus ".into()]),
                difficulty: Some("hard".into()),
                reward: 50,
                priority: Some(4),
                due_at: Some("2024-06-07T18:00:00Z".into()),
                ..Default::default()
            },
        )
        .expect("create");

    assert_eq!(created.name, "Learn Rust");
    assert_eq!(created.difficulty, Difficulty::Hard);
    assert_eq!(created.duration_minutes, 30);
    assert_eq!(created.tags.iter().collect::<Vec<_>>(), vec!["focus", "study"]);
    assert_eq!(
        created.due_at,
        Some(Utc.with_ymd_and_hms(2024, 6, 7, 18, 0, 0).unwrap())
    );
    assert!(!created.completed);

    let fetched = harness
        .quests
        .get_quest(&harness.owner, &created.id)
        .expect("fetch");
    assert_eq!(fetched, created);

    harness.clock.advance(Duration::minutes(5));
    let updated = harness
        .quests
        .update_quest(
            &harness.owner,
            &created.id,
            QuestUpdateInput {
                reward: Some(75),
                description: Some(None),
                due_at: Some(None),
                ..Default::default()
            },
        )
        .expect("update");
    assert_eq!(updated.reward, 75);
    assert_eq!(updated.description, None);
    assert_eq!(updated.due_at, None);
    assert_eq!(updated.name, "Learn Rust");
    assert_eq!(updated.created_at, created.created_at);

    let reloaded = harness
        .quests
        .get_quest(&harness.owner, &created.id)
        .expect("reload");
    assert_eq!(reloaded, updated);

    harness
        .quests
        .delete_quest(&harness.owner, &created.id)
        .expect("delete");
    assert!(matches!(
        harness.quests.get_quest(&harness.owner, &created.id),
        Err(AppError::NotFound)
    ));
}

#[test]
fn invalid_input_is_rejected() {
    let harness = setup();

    let zero_reward = harness.quests.create_quest(
        &harness.owner,
        QuestCreateInput {
            name: "Free lunch".into(),
            reward: 0,
            ..Default::default()
        },
    );
    assert!(matches!(zero_reward, Err(AppError::Validation { .. })));

    let blank_name = harness.quests.create_quest(
        &harness.owner,
        QuestCreateInput {
            name: "   ".into(),
            reward: 10,
            ..Default::default()
        },
    );
    assert!(matches!(blank_name, Err(AppError::Validation { .. })));

    let bad_priority = harness.quests.create_quest(
        &harness.owner,
        QuestCreateInput {
            name: "Too important".into(),
            reward: 10,
            priority: Some(9),
            ..Default::default()
        },
    );
    assert!(matches!(bad_priority, Err(AppError::Validation { .. })));

    let unknown_user = harness.quests.create_quest(
        "no-such-user",
        QuestCreateInput {
            name: "Ghost".into(),
            reward: 10,
            ..Default::default()
        },
    );
    assert!(matches!(unknown_user, Err(AppError::NotFound)));
}

#[test]
fn other_users_cannot_touch_a_quest() {
    let harness = setup();
    let quest = harness
        .quests
        .create_quest(
            &harness.owner,
            QuestCreateInput {
                name: "Private".into(),
                reward: 10,
                ..Default::default()
            },
        )
        .expect("create");

    assert!(matches!(
        harness.quests.get_quest(&harness.stranger, &quest.id),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        harness.quests.update_quest(
            &harness.stranger,
            &quest.id,
            QuestUpdateInput {
                name: Some("Hijacked".into()),
                ..Default::default()
            },
        ),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        harness.quests.complete_quest(&harness.stranger, &quest.id),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        harness.quests.delete_quest(&harness.stranger, &quest.id),
        Err(AppError::Unauthorized)
    ));

    let untouched = harness
        .quests
        .get_quest(&harness.owner, &quest.id)
        .expect("still there");
    assert_eq!(untouched.name, "Private");
    assert!(!untouched.completed);
}

#[test]
fn lists_split_active_and_completed_by_priority() {
    let harness = setup();
    let mut ids = Vec::new();
    for (name, priority) in [("low", 1), ("high", 5), ("mid", 3)] {
        let quest = harness
            .quests
            .create_quest(
                &harness.owner,
                QuestCreateInput {
                    name: name.into(),
                    reward: 10,
                    priority: Some(priority),
                    ..Default::default()
                },
            )
            .expect("create");
        ids.push(quest.id);
        harness.clock.advance(Duration::seconds(1));
    }

    let active: Vec<_> = harness
        .quests
        .list_active_quests(&harness.owner)
        .expect("active")
        .into_iter()
        .map(|quest| quest.name)
        .collect();
    assert_eq!(active, vec!["high", "mid", "low"]);

    harness
        .quests
        .complete_quest(&harness.owner, &ids[0])
        .expect("complete low");

    let active = harness.quests.list_active_quests(&harness.owner).expect("active");
    assert_eq!(active.len(), 2);
    let completed = harness
        .quests
        .list_completed_quests(&harness.owner)
        .expect("completed");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].name, "low");
    assert!(completed[0].completed_at.is_some());

    assert!(harness
        .quests
        .list_active_quests(&harness.stranger)
        .expect("stranger list")
        .is_empty());
}

#[test]
fn completed_quests_cannot_be_edited() {
    let harness = setup();
    let quest = harness
        .quests
        .create_quest(
            &harness.owner,
            QuestCreateInput {
                name: "Credited once".into(),
                reward: 10,
                ..Default::default()
            },
        )
        .expect("create");
    harness
        .quests
        .complete_quest(&harness.owner, &quest.id)
        .expect("complete");

    let edit = harness.quests.update_quest(
        &harness.owner,
        &quest.id,
        QuestUpdateInput {
            name: Some("changed".into()),
            reward: Some(999),
            ..Default::default()
        },
    );
    assert!(matches!(edit, Err(AppError::Conflict { .. })));

    let stored = harness
        .quests
        .get_quest(&harness.owner, &quest.id)
        .expect("stored quest");
    assert!(stored.completed);
    assert_eq!(stored.reward, 10);
    assert_eq!(stored.name, "Credited once");

    harness
        .quests
        .delete_quest(&harness.owner, &quest.id)
        .expect("completed quests can still be deleted");
}
