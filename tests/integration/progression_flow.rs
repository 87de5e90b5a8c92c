use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Duration, TimeZone, Utc};
use questforge_app_lib::db::DbPool;
use questforge_app_lib::models::progression::AchievementId;
use questforge_app_lib::models::quest::{QuestCreateInput, QuestRecord};
use questforge_app_lib::services::progression_engine::ProgressionEngine;
use questforge_app_lib::services::quest_service::QuestService;
use questforge_app_lib::services::user_service::UserService;
use questforge_app_lib::utils::clock::FixedClock;
use tempfile::{tempdir, TempDir};

struct Harness {
    _dir: TempDir,
    clock: FixedClock,
    users: Arc<UserService>,
    quests: QuestService,
    user_id: String,
}

fn monday_at(hour: u32) -> DateTime<Utc> {
    // 2024-06-03 is a Monday.
    Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap()
}

fn setup(now: DateTime<Utc>) -> Harness {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("progression.sqlite")).expect("db pool");
    let clock = FixedClock::new(now);
    let engine = ProgressionEngine::default();
    let users = Arc::new(UserService::new(pool.clone(), Arc::new(clock.clone()), engine));
    let quests = QuestService::new(pool, Arc::new(clock.clone()), engine);
    let user_id = users.register("hero", "secret1").expect("register").id;

    Harness {
        _dir: dir,
        clock,
        users,
        quests,
        user_id,
    }
}

fn add_quest(harness: &Harness, name: &str, reward: i64) -> QuestRecord {
    harness
        .quests
        .create_quest(
            &harness.user_id,
            QuestCreateInput {
                name: name.into(),
                reward,
                ..Default::default()
            },
        )
        .expect("create quest")
}

#[test]
fn first_completion_levels_up_and_unlocks_weekly_achievements() {
    let harness = setup(monday_at(9));
    let quest = add_quest(&harness, "Deep work block", 120);

    let result = harness
        .quests
        .complete_quest(&harness.user_id, &quest.id)
        .expect("complete quest");

    let outcome = result.outcome.expect("reward credited");
    assert_eq!(outcome.points_earned, 120);
    assert!(outcome.leveled_up);
    assert_eq!(outcome.new_level, Some(2));
    assert_eq!(
        outcome.level_up_message().as_deref(),
        Some("Congratulations! You've reached level 2!")
    );
    assert_eq!(
        outcome.newly_unlocked_achievements,
        vec![AchievementId::WeekWarrior, AchievementId::WeekContributor]
    );
    assert!(result.quest.completed);
    assert_eq!(result.quest.completed_at, Some(monday_at(9)));

    let user = harness.users.get_user(&harness.user_id).expect("user");
    assert_eq!(user.progression.points, 120);
    assert_eq!(user.progression.level, 2);
    assert_eq!(user.progression.streak, 1);
    assert_eq!(user.progression.points_this_week, 120);
    assert_eq!(user.progression.last_completed_at, Some(monday_at(9)));
}

#[test]
fn completing_twice_credits_once() {
    let harness = setup(monday_at(9));
    let quest = add_quest(&harness, "Inbox zero", 40);

    let first = harness
        .quests
        .complete_quest(&harness.user_id, &quest.id)
        .expect("first completion");
    assert!(first.outcome.is_some());

    harness.clock.advance(Duration::hours(1));
    let second = harness
        .quests
        .complete_quest(&harness.user_id, &quest.id)
        .expect("second completion is a no-op");
    assert!(second.outcome.is_none());
    assert_eq!(second.quest.completed_at, Some(monday_at(9)));

    let user = harness.users.get_user(&harness.user_id).expect("user");
    assert_eq!(user.progression.points, 40);
    assert_eq!(user.progression.last_completed_at, Some(monday_at(9)));
}

#[test]
fn concurrent_completions_of_one_quest_credit_once() {
    let harness = setup(monday_at(9));
    let quest = add_quest(&harness, "Race condition", 25);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = harness.quests.clone();
            let user_id = harness.user_id.clone();
            let quest_id = quest.id.clone();
            thread::spawn(move || service.complete_quest(&user_id, &quest_id))
        })
        .collect();

    let credited = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread").expect("completion"))
        .filter(|result| result.outcome.is_some())
        .count();

    assert_eq!(credited, 1);
    let user = harness.users.get_user(&harness.user_id).expect("user");
    assert_eq!(user.progression.points, 25);
}

#[test]
fn streak_follows_calendar_days() {
    let harness = setup(monday_at(9));
    let complete = |name: &str| {
        let quest = add_quest(&harness, name, 5);
        harness
            .quests
            .complete_quest(&harness.user_id, &quest.id)
            .expect("complete");
        harness
            .users
            .get_user(&harness.user_id)
            .expect("user")
            .progression
            .streak
    };

    assert_eq!(complete("mon morning"), 1);
    harness.clock.set(monday_at(22));
    assert_eq!(complete("mon night"), 1);
    // Tuesday 00:30, under two hours after the previous completion.
    harness.clock.set(monday_at(22) + Duration::minutes(150));
    assert_eq!(complete("tue"), 2);
    harness.clock.advance(Duration::days(1));
    assert_eq!(complete("wed"), 3);
    harness.clock.advance(Duration::days(2));
    assert_eq!(complete("fri"), 1);
}

#[test]
fn crossing_five_hundred_unlocks_point_achievements_in_order() {
    let harness = setup(monday_at(9));
    let warmup = add_quest(&harness, "Warmup", 480);
    harness
        .quests
        .complete_quest(&harness.user_id, &warmup.id)
        .expect("warmup");

    harness.clock.advance(Duration::days(7));
    let quest = add_quest(&harness, "Push over", 30);
    let outcome = harness
        .quests
        .complete_quest(&harness.user_id, &quest.id)
        .expect("complete")
        .outcome
        .expect("credited");

    assert_eq!(outcome.new_level, Some(4));
    assert_eq!(
        outcome.newly_unlocked_achievements,
        vec![AchievementId::PointsProdigy, AchievementId::HalfwayHero]
    );

    let user = harness.users.get_user(&harness.user_id).expect("user");
    assert_eq!(user.progression.points, 510);
    assert_eq!(user.progression.level, 4);
}

#[test]
fn weekly_points_roll_over_on_first_completion_of_a_new_week() {
    // Sunday evening, end of the registration week.
    let harness = setup(monday_at(9));
    harness.clock.set(Utc.with_ymd_and_hms(2024, 6, 9, 20, 0, 0).unwrap());
    let sunday = add_quest(&harness, "Sunday", 30);
    harness
        .quests
        .complete_quest(&harness.user_id, &sunday.id)
        .expect("sunday completion");

    harness.clock.set(Utc.with_ymd_and_hms(2024, 6, 10, 7, 0, 0).unwrap());
    let monday = add_quest(&harness, "Monday", 20);
    harness
        .quests
        .complete_quest(&harness.user_id, &monday.id)
        .expect("monday completion");

    let user = harness.users.get_user(&harness.user_id).expect("user");
    assert_eq!(user.progression.points, 50);
    assert_eq!(user.progression.points_this_week, 20);
    assert_eq!(
        user.points_week_start,
        Some(chrono::NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
    );
}

#[test]
fn achievements_are_never_revoked_by_weekly_reset() {
    let harness = setup(monday_at(9));
    let big = add_quest(&harness, "Big week", 150);
    harness
        .quests
        .complete_quest(&harness.user_id, &big.id)
        .expect("complete");

    harness.clock.advance(Duration::days(7));
    assert_eq!(harness.users.roll_over_weekly_points().expect("rollover"), 1);

    let user = harness.users.get_user(&harness.user_id).expect("user");
    assert_eq!(user.progression.points_this_week, 0);
    assert!(user
        .progression
        .unlocked_achievements
        .contains(AchievementId::WeekWarrior));
}
