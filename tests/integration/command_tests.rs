use std::sync::Arc;

use chrono::{TimeZone, Utc};
use questforge_app_lib::commands::quest::{
    quests_complete, quests_create, quests_delete, quests_list, quests_update, QuestListKind,
};
use questforge_app_lib::commands::user::{
    users_dashboard, users_login, users_profile, users_register, CredentialsInput,
};
use questforge_app_lib::commands::{daily, description, AppState};
use questforge_app_lib::config::AppConfig;
use questforge_app_lib::db::DbPool;
use questforge_app_lib::models::quest::{QuestCreateInput, QuestUpdateInput};
use questforge_app_lib::services::description_service::FALLBACK_DESCRIPTION;
use questforge_app_lib::utils::clock::FixedClock;
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, AppState) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("commands.sqlite")).expect("db pool");
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap());
    let state = AppState::new(pool, &AppConfig::default(), Arc::new(clock)).expect("state");
    (dir, state)
}

fn credentials(username: &str, password: &str) -> CredentialsInput {
    CredentialsInput {
        username: username.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn quest_lifecycle_through_commands() {
    let (_dir, state) = setup();
    let user = users_register(&state, credentials("frodo", "mordor1"))
        .await
        .expect("register");
    let login = users_login(&state, credentials("frodo", "mordor1"))
        .await
        .expect("login");
    assert_eq!(login.id, user.id);

    let quest = quests_create(
        &state,
        user.id.clone(),
        QuestCreateInput {
            name: "Walk to the mountain".into(),
            reward: 150,
            ..Default::default()
        },
    )
    .await
    .expect("create");

    let renamed = quests_update(
        &state,
        user.id.clone(),
        quest.id.clone(),
        QuestUpdateInput {
            name: Some("Walk further".into()),
            ..Default::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(renamed.name, "Walk further");

    let active = quests_list(&state, user.id.clone(), None).await.expect("list");
    assert_eq!(active.len(), 1);

    let result = quests_complete(&state, user.id.clone(), quest.id.clone())
        .await
        .expect("complete");
    let outcome = result.outcome.expect("credited");
    assert_eq!(outcome.new_level, Some(2));

    let completed = quests_list(&state, user.id.clone(), Some(QuestListKind::Completed))
        .await
        .expect("completed list");
    assert_eq!(completed.len(), 1);

    let profile = users_profile(&state, user.id.clone()).await.expect("profile");
    assert_eq!(profile.points, 150);
    assert_eq!(profile.level, 2);

    quests_delete(&state, user.id.clone(), quest.id.clone())
        .await
        .expect("delete");
    let completed = quests_list(&state, user.id.clone(), Some(QuestListKind::Completed))
        .await
        .expect("completed list");
    assert!(completed.is_empty());
}

#[tokio::test]
async fn dashboard_generates_daily_quests() {
    let (_dir, state) = setup();
    let user = users_register(&state, credentials("sam", "potatoes"))
        .await
        .expect("register");

    let stats = users_dashboard(&state, user.id.clone()).await.expect("dashboard");
    assert_eq!(stats.active_quests, 0);
    assert_eq!(stats.total_points, 0);

    let board = daily::daily_quests_fetch(&state, user.id.clone())
        .await
        .expect("daily board");
    assert!(!board.generated);
    assert!(board.assignment.is_some());
    assert!(!board.quests.is_empty());

    let daily_list = quests_list(&state, user.id.clone(), Some(QuestListKind::Daily))
        .await
        .expect("daily list");
    assert_eq!(daily_list.len(), board.quests.len());
}

#[tokio::test]
async fn errors_carry_stable_codes() {
    let (_dir, state) = setup();
    let owner = users_register(&state, credentials("owner", "secret1"))
        .await
        .expect("register");
    let other = users_register(&state, credentials("other", "secret1"))
        .await
        .expect("register");

    let duplicate = users_register(&state, credentials("owner", "secret1"))
        .await
        .expect_err("duplicate");
    assert_eq!(duplicate.code, "CONFLICT");

    let bad_login = users_login(&state, credentials("owner", "nope-nope"))
        .await
        .expect_err("wrong password");
    assert_eq!(bad_login.code, "UNAUTHORIZED");

    let bad_reward = quests_create(
        &state,
        owner.id.clone(),
        QuestCreateInput {
            name: "Nothing".into(),
            reward: -5,
            ..Default::default()
        },
    )
    .await
    .expect_err("negative reward");
    assert_eq!(bad_reward.code, "VALIDATION_ERROR");
    assert_eq!(
        bad_reward.details,
        Some(serde_json::json!({ "reward": -5 }))
    );

    let quest = quests_create(
        &state,
        owner.id.clone(),
        QuestCreateInput {
            name: "Mine".into(),
            reward: 5,
            ..Default::default()
        },
    )
    .await
    .expect("create");

    let forbidden = quests_complete(&state, other.id.clone(), quest.id.clone())
        .await
        .expect_err("not the owner");
    assert_eq!(forbidden.code, "UNAUTHORIZED");

    let missing = quests_delete(&state, owner.id.clone(), "missing".into())
        .await
        .expect_err("missing quest");
    assert_eq!(missing.code, "NOT_FOUND");
}

#[tokio::test]
async fn suggestions_fall_back_without_api_key() {
    let (_dir, state) = setup();
    assert!(!state.descriptions().is_enabled());

    let suggestion = description::descriptions_suggest(&state, "  Morning Run ".into())
        .await
        .expect("suggest");
    assert_eq!(suggestion.title, "Morning Run");
    assert_eq!(suggestion.description, FALLBACK_DESCRIPTION);

    let empty = description::descriptions_suggest(&state, "   ".into())
        .await
        .expect_err("empty title");
    assert_eq!(empty.code, "VALIDATION_ERROR");
}
