use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Days, SubsecRound, Utc};
use tracing::{debug, error, info};

use crate::db::repositories::quest_repository::QuestRepository;
use crate::db::repositories::user_repository::{UserRepository, UserRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::progression::ProgressionState;
use crate::models::user::{DashboardStats, UserProfile, UserRecord};
use crate::services::achievement_catalog::achievement_names;
use crate::services::progression_engine::ProgressionEngine;
use crate::utils::calendar::{local_date, start_of_day, week_start};
use crate::utils::clock::SharedClock;
use crate::utils::crypto::{hash_password, verify_password};

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo123";

const MIN_PASSWORD_CHARS: usize = 6;
const MIN_USERNAME_CHARS: usize = 3;
const MAX_USERNAME_CHARS: usize = 80;

pub struct UserService {
    db: DbPool,
    clock: SharedClock,
    engine: ProgressionEngine,
    weekly_job_started: AtomicBool,
}

impl UserService {
    pub fn new(db: DbPool, clock: SharedClock, engine: ProgressionEngine) -> Self {
        Self {
            db,
            clock,
            engine,
            weekly_job_started: AtomicBool::new(false),
        }
    }

    pub fn register(&self, username: &str, password: &str) -> AppResult<UserRecord> {
        let username = normalize_username(username)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }

        let now = self.clock.now().trunc_subsecs(0);
        let record = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            password_hash: hash_password(password),
            progression: ProgressionState::default(),
            points_week_start: Some(week_start(local_date(now, self.engine.timezone()))),
            created_at: now,
        };
        let row = UserRow::from_record(&record);

        self.db.with_connection(|conn| {
            if UserRepository::find_by_username(conn, &record.username)?.is_some() {
                return Err(AppError::conflict("Username already exists"));
            }
            UserRepository::insert(conn, &row)
        })?;

        info!(target: "app::users", user_id = %record.id, username = %record.username, "user registered");
        Ok(record)
    }

    /// Unknown usernames and wrong passwords are indistinguishable to the caller.
    pub fn authenticate(&self, username: &str, password: &str) -> AppResult<UserRecord> {
        let username = username.trim();
        let row = self
            .db
            .with_connection(|conn| UserRepository::find_by_username(conn, username))?;

        let Some(row) = row else {
            debug!(target: "app::users", username, "login for unknown user");
            return Err(AppError::unauthorized());
        };

        if !verify_password(password, &row.password_hash)? {
            debug!(target: "app::users", username, "login with wrong password");
            return Err(AppError::unauthorized());
        }

        let record = row.into_record()?;
        info!(target: "app::users", user_id = %record.id, "user authenticated");
        Ok(record)
    }

    pub fn get_user(&self, id: &str) -> AppResult<UserRecord> {
        self.db
            .with_connection(|conn| UserRepository::find_by_id(conn, id))?
            .ok_or_else(AppError::not_found)?
            .into_record()
    }

    pub fn profile(&self, id: &str) -> AppResult<UserProfile> {
        let user = self.get_user(id)?;
        let level_progress = self.engine.level_progress(&user.progression);
        let progression = &user.progression;

        Ok(UserProfile {
            id: user.id.clone(),
            username: user.username.clone(),
            points: progression.points,
            level: progression.level,
            streak: progression.streak,
            points_this_week: progression.points_this_week,
            achievements: achievement_names(progression.unlocked_achievements.iter()),
            level_progress,
        })
    }

    pub fn dashboard(&self, id: &str) -> AppResult<DashboardStats> {
        let user = self.get_user(id)?;
        let (active, completed) = self.db.with_connection(|conn| {
            let active = QuestRepository::list_by_user(conn, id, Some(false))?;
            let completed = QuestRepository::list_by_user(conn, id, Some(true))?;
            Ok((active, completed))
        })?;

        let mut active_quests = 0;
        for row in active {
            if !row.into_record()?.is_daily() {
                active_quests += 1;
            }
        }

        let progression = &user.progression;
        Ok(DashboardStats {
            total_points: progression.points,
            points_this_week: progression.points_this_week,
            streak: progression.streak,
            achievements: achievement_names(progression.unlocked_achievements.iter()),
            active_quests,
            completed_quests: completed.len(),
        })
    }

    /// Creates the demo account on an empty database.
    pub fn ensure_demo_user(&self) -> AppResult<Option<UserRecord>> {
        let count = self.db.with_connection(UserRepository::count)?;
        if count > 0 {
            return Ok(None);
        }
        let user = self.register(DEMO_USERNAME, DEMO_PASSWORD)?;
        info!(target: "app::users", user_id = %user.id, "demo user seeded");
        Ok(Some(user))
    }

    /// Zeroes weekly points for every user whose counter belongs to an
    /// earlier week than the current one.
    pub fn roll_over_weekly_points(&self) -> AppResult<usize> {
        let monday = week_start(local_date(self.clock.now(), self.engine.timezone()));
        let rolled = self
            .db
            .with_connection(|conn| UserRepository::roll_over_weekly_points(conn, monday, None))?;
        if rolled > 0 {
            info!(target: "app::users", rolled, %monday, "weekly points rolled over");
        }
        Ok(rolled)
    }

    /// Runs a rollover now and starts a background thread that repeats it at
    /// every following Monday 00:00. Subsequent calls are no-ops.
    pub fn ensure_weekly_reset_job(self: &Arc<Self>) -> AppResult<()> {
        if self
            .weekly_job_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            if let Err(err) = self.roll_over_weekly_points() {
                error!(target: "app::users", error = %err, "initial weekly rollover failed");
            }

            let runner = Arc::clone(self);
            if let Err(err) = thread::Builder::new()
                .name("weekly-points-reset".to_string())
                .spawn(move || runner.run_weekly_loop())
            {
                self.weekly_job_started.store(false, Ordering::SeqCst);
                error!(target: "app::users", error = %err, "failed to start weekly reset thread");
                return Err(AppError::other(format!("failed to start weekly reset job: {err}")));
            }
        }

        Ok(())
    }

    fn run_weekly_loop(self: Arc<Self>) {
        loop {
            let now = self.clock.now();
            let next_run = self.next_week_start(now);
            thread::sleep(duration_until(next_run, now));

            if let Err(err) = self.roll_over_weekly_points() {
                error!(target: "app::users", error = %err, "scheduled weekly rollover failed");
            }
        }
    }

    fn next_week_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let timezone = self.engine.timezone();
        let monday = week_start(local_date(now, timezone));
        let next = monday.checked_add_days(Days::new(7)).unwrap_or(monday);
        start_of_day(next, timezone)
    }
}

fn duration_until(target: DateTime<Utc>, now: DateTime<Utc>) -> StdDuration {
    (target - now)
        .to_std()
        .unwrap_or_else(|_| StdDuration::from_secs(60))
}

fn normalize_username(username: &str) -> AppResult<String> {
    let trimmed = username.trim();
    let length = trimmed.chars().count();
    if length < MIN_USERNAME_CHARS {
        return Err(AppError::validation(format!(
            "Username must be at least {MIN_USERNAME_CHARS} characters"
        )));
    }
    if length > MAX_USERNAME_CHARS {
        return Err(AppError::validation(format!(
            "Username must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}
