use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use questforge_app_lib::db::DbPool;
use questforge_app_lib::error::AppError;
use questforge_app_lib::models::progression::AchievementId;
use questforge_app_lib::models::quest::QuestCreateInput;
use questforge_app_lib::services::achievement_catalog::achievement_name;
use questforge_app_lib::services::daily_quest_service::DailyQuestService;
use questforge_app_lib::services::progression_engine::ProgressionEngine;
use questforge_app_lib::services::quest_service::QuestService;
use questforge_app_lib::services::user_service::{UserService, DEMO_PASSWORD, DEMO_USERNAME};
use questforge_app_lib::utils::clock::FixedClock;
use tempfile::{tempdir, TempDir};

struct Harness {
    _dir: TempDir,
    clock: FixedClock,
    users: UserService,
    quests: QuestService,
    daily: DailyQuestService,
}

fn setup() -> Harness {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("users.sqlite")).expect("db pool");
    // Monday.
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap());
    let engine = ProgressionEngine::default();

    Harness {
        users: UserService::new(pool.clone(), Arc::new(clock.clone()), engine),
        quests: QuestService::new(pool.clone(), Arc::new(clock.clone()), engine),
        daily: DailyQuestService::new(pool, Arc::new(clock.clone()), engine.timezone()),
        clock,
        _dir: dir,
    }
}

fn complete_new_quest(harness: &Harness, user_id: &str, name: &str, reward: i64) {
    let quest = harness
        .quests
        .create_quest(
            user_id,
            QuestCreateInput {
                name: name.into(),
                reward,
                ..Default::default()
            },
        )
        .expect("create");
    harness
        .quests
        .complete_quest(user_id, &quest.id)
        .expect("complete");
}

#[test]
fn register_then_authenticate() {
    let harness = setup();
    let registered = harness.users.register("  Alice ", "wonderland").expect("register");
    assert_eq!(registered.username, "Alice");
    assert_eq!(registered.progression.points, 0);
    assert_eq!(registered.progression.level, 1);
    assert_eq!(
        registered.points_week_start,
        Some(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap())
    );
    assert!(registered.password_hash.starts_with("v1:"));

    let authenticated = harness
        .users
        .authenticate("Alice", "wonderland")
        .expect("login");
    assert_eq!(authenticated.id, registered.id);
}

#[test]
fn registration_and_login_failures() {
    let harness = setup();
    harness.users.register("bob", "builder").expect("register");

    assert!(matches!(
        harness.users.register("bob", "another"),
        Err(AppError::Conflict { .. })
    ));
    assert!(matches!(
        harness.users.register("carol", "short"),
        Err(AppError::Validation { .. })
    ));
    assert!(matches!(
        harness.users.register("   ", "longenough"),
        Err(AppError::Validation { .. })
    ));
    assert!(matches!(
        harness.users.register("ab", "longenough"),
        Err(AppError::Validation { .. })
    ));
    assert!(matches!(
        harness.users.register(&"z".repeat(81), "longenough"),
        Err(AppError::Validation { .. })
    ));
    let longest = "y".repeat(80);
    assert_eq!(
        harness.users.register(&longest, "longenough").expect("80 chars").username,
        longest
    );
    harness.users.register("abc", "longenough").expect("3 chars");
    assert!(matches!(
        harness.users.authenticate("bob", "wrong-password"),
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        harness.users.authenticate("nobody", "builder"),
        Err(AppError::Unauthorized)
    ));
}

#[test]
fn demo_user_is_seeded_once_on_empty_database() {
    let harness = setup();
    let demo = harness
        .users
        .ensure_demo_user()
        .expect("seed")
        .expect("created");
    assert_eq!(demo.username, DEMO_USERNAME);
    harness
        .users
        .authenticate(DEMO_USERNAME, DEMO_PASSWORD)
        .expect("demo login");

    assert!(harness.users.ensure_demo_user().expect("second seed").is_none());
}

#[test]
fn profile_reports_level_progress_and_achievement_names() {
    let harness = setup();
    let user = harness.users.register("dana", "secret1").expect("register");
    complete_new_quest(&harness, &user.id, "Big push", 175);

    let profile = harness.users.profile(&user.id).expect("profile");
    assert_eq!(profile.points, 175);
    assert_eq!(profile.level, 2);
    assert_eq!(profile.streak, 1);
    assert_eq!(profile.level_progress.level, 2);
    assert_eq!(profile.level_progress.points_to_next_level, Some(75));
    assert!((profile.level_progress.progress_percentage - 50.0).abs() < f64::EPSILON);
    assert_eq!(profile.achievements.len(), 2);
    assert!(profile.achievements.iter().all(|name| !name.is_empty()));
}

#[test]
fn dashboard_counts_custom_quests_only_as_active() {
    let harness = setup();
    let user = harness.users.register("erin", "secret1").expect("register");
    let today = harness.daily.today();
    harness
        .daily
        .ensure_daily_quests(&user.id, today)
        .expect("daily quests");

    for name in ["one", "two"] {
        harness
            .quests
            .create_quest(
                &user.id,
                QuestCreateInput {
                    name: name.into(),
                    reward: 10,
                    ..Default::default()
                },
            )
            .expect("create");
    }
    complete_new_quest(&harness, &user.id, "done", 60);

    let stats = harness.users.dashboard(&user.id).expect("dashboard");
    assert_eq!(stats.active_quests, 2);
    assert_eq!(stats.completed_quests, 1);
    assert_eq!(stats.total_points, 60);
    assert_eq!(stats.points_this_week, 60);
    assert_eq!(stats.streak, 1);
    assert_eq!(stats.achievements.len(), 1);
}

#[test]
fn rollover_only_resets_stale_weekly_counters() {
    let harness = setup();
    let early = harness.users.register("early", "secret1").expect("register");
    complete_new_quest(&harness, &early.id, "first week", 40);

    harness.clock.advance(Duration::days(7));
    let late = harness.users.register("late", "secret1").expect("register");
    complete_new_quest(&harness, &late.id, "second week", 25);

    assert_eq!(harness.users.roll_over_weekly_points().expect("rollover"), 1);
    assert_eq!(harness.users.roll_over_weekly_points().expect("again"), 0);

    let early = harness.users.get_user(&early.id).expect("early");
    assert_eq!(early.progression.points_this_week, 0);
    assert_eq!(early.progression.points, 40);
    assert_eq!(
        early.points_week_start,
        Some(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
    );

    let late = harness.users.get_user(&late.id).expect("late");
    assert_eq!(late.progression.points_this_week, 25);
}

#[test]
fn unknown_user_lookups_are_not_found() {
    let harness = setup();
    assert!(matches!(
        harness.users.get_user("missing"),
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        harness.users.dashboard("missing"),
        Err(AppError::NotFound)
    ));
}

#[test]
fn achievements_are_listed_in_unlock_order() {
    let harness = setup();
    let user = harness.users.register("gwen", "secret1").expect("register");
    complete_new_quest(&harness, &user.id, "warm up", 60);
    complete_new_quest(&harness, &user.id, "keep going", 60);

    let expected = vec![
        achievement_name(AchievementId::WeekContributor).to_string(),
        achievement_name(AchievementId::WeekWarrior).to_string(),
    ];
    assert_eq!(harness.users.profile(&user.id).expect("profile").achievements, expected);
    assert_eq!(harness.users.dashboard(&user.id).expect("dashboard").achievements, expected);
}
