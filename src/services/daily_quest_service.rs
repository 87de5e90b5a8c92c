use chrono::{DateTime, Days, NaiveDate, SubsecRound, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::repositories::daily_quest_repository::{AssignmentRow, DailyQuestRepository};
use crate::db::repositories::quest_repository::{QuestRepository, QuestRow};
use crate::db::repositories::user_repository::UserRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::daily_quest::{DailyQuestAssignment, DailyQuestTemplate, QuestCategory};
use crate::models::quest::{QuestRecord, TagSet, DAILY_TAG};
use crate::utils::calendar::{end_of_day, local_date, start_of_day};
use crate::utils::clock::SharedClock;

/// Priority given to generated daily quests.
pub const DAILY_QUEST_PRIORITY: u8 = 3;

#[derive(Clone)]
pub struct DailyQuestService {
    db: DbPool,
    clock: SharedClock,
    timezone: Tz,
}

impl DailyQuestService {
    pub fn new(db: DbPool, clock: SharedClock, timezone: Tz) -> Self {
        Self {
            db,
            clock,
            timezone,
        }
    }

    /// Calendar date "now" falls on in the configured time zone.
    pub fn today(&self) -> NaiveDate {
        local_date(self.clock.now(), self.timezone)
    }

    /// Generates today's batch for the user unless one already exists.
    ///
    /// Returns the new assignment, or `None` when the batch for `today` was
    /// generated earlier. The whole batch commits or none of it does.
    pub fn ensure_daily_quests(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> AppResult<Option<DailyQuestAssignment>> {
        let user = self
            .db
            .with_connection(|conn| UserRepository::find_by_id(conn, user_id))?
            .ok_or_else(AppError::not_found)?
            .into_record()?;
        if user.progression.last_daily_quest_date == Some(today) {
            debug!(target: "app::daily", user_id, %today, "daily quests already generated");
            return Ok(None);
        }

        let now = self.clock.now().trunc_subsecs(0);
        let timezone = self.timezone;
        let assignment = self.db.with_transaction(|tx| {
            generate_batch(tx, user_id, today, now, timezone, &mut rand::thread_rng())
        })?;

        if let Some(assignment) = &assignment {
            info!(
                target: "app::daily",
                user_id,
                %today,
                category = %assignment.category,
                "daily quests generated"
            );
        }
        Ok(assignment)
    }

    /// Category for the next batch: never the same as the user's most recent
    /// assignment.
    pub fn pick_category(&self, user_id: &str) -> AppResult<QuestCategory> {
        let previous = self
            .db
            .with_connection(|conn| previous_category(conn, user_id))?;
        Ok(choose_category(previous, &mut rand::thread_rng()))
    }

    pub fn todays_assignment(&self, user_id: &str) -> AppResult<Option<DailyQuestAssignment>> {
        self.assignment_for(user_id, self.today())
    }

    pub fn assignment_for(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<Option<DailyQuestAssignment>> {
        self.db
            .with_connection(|conn| DailyQuestRepository::find_assignment(conn, user_id, date))?
            .map(AssignmentRow::into_assignment)
            .transpose()
    }

    pub fn list_templates(
        &self,
        category: Option<QuestCategory>,
    ) -> AppResult<Vec<DailyQuestTemplate>> {
        let rows = self
            .db
            .with_connection(|conn| DailyQuestRepository::list_templates(conn, category))?;
        rows.into_iter()
            .map(|row| row.into_template())
            .collect::<AppResult<Vec<_>>>()
    }

    /// Marks the assignment for `today` completed once every daily quest
    /// created on that date is done. Returns `true` only when this call
    /// completed the batch.
    ///
    /// Takes a connection so it can run inside the caller's completion
    /// transaction.
    pub fn refresh_daily_completion(
        conn: &Connection,
        user_id: &str,
        today: NaiveDate,
        timezone: Tz,
    ) -> AppResult<bool> {
        let quests = daily_quests_created_on(conn, user_id, today, timezone)?;
        if quests.is_empty() || quests.iter().any(|quest| !quest.completed) {
            return Ok(false);
        }

        let transitioned = DailyQuestRepository::mark_assignment_completed(conn, user_id, today)?;
        if transitioned {
            info!(target: "app::daily", user_id, %today, "daily quest batch completed");
        }
        Ok(transitioned)
    }
}

/// Uniform choice over every category except `previous`.
pub fn choose_category<R: Rng + ?Sized>(
    previous: Option<QuestCategory>,
    rng: &mut R,
) -> QuestCategory {
    let candidates: Vec<QuestCategory> = QuestCategory::ALL
        .into_iter()
        .filter(|category| Some(*category) != previous)
        .collect();
    candidates
        .choose(rng)
        .copied()
        .unwrap_or(QuestCategory::Strength)
}

/// Daily quests (tagged `"daily"`) whose creation instant falls on `date`
/// in `timezone`.
pub fn daily_quests_created_on(
    conn: &Connection,
    user_id: &str,
    date: NaiveDate,
    timezone: Tz,
) -> AppResult<Vec<QuestRecord>> {
    let since = start_of_day(date, timezone);
    let until = date
        .checked_add_days(Days::new(1))
        .map(|next| start_of_day(next, timezone));

    let rows = QuestRepository::list_created_since(conn, user_id, &since)?;
    let mut quests = Vec::with_capacity(rows.len());
    for row in rows {
        let quest = row.into_record()?;
        let before_end = until.map_or(true, |until| quest.created_at < until);
        if before_end && quest.is_daily() {
            quests.push(quest);
        }
    }
    Ok(quests)
}

fn previous_category(conn: &Connection, user_id: &str) -> AppResult<Option<QuestCategory>> {
    DailyQuestRepository::find_latest_assignment(conn, user_id)?
        .map(|row| row.into_assignment().map(|assignment| assignment.category))
        .transpose()
}

fn generate_batch<R: Rng + ?Sized>(
    conn: &Connection,
    user_id: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
    timezone: Tz,
    rng: &mut R,
) -> AppResult<Option<DailyQuestAssignment>> {
    // Re-checked under the write lock: a concurrent call may have won.
    let user = UserRepository::find_by_id(conn, user_id)?
        .ok_or_else(AppError::not_found)?
        .into_record()?;
    if user.progression.last_daily_quest_date == Some(today) {
        return Ok(None);
    }
    if DailyQuestRepository::find_assignment(conn, user_id, today)?.is_some() {
        UserRepository::set_last_daily_quest_date(conn, user_id, today)?;
        return Ok(None);
    }

    let category = choose_category(previous_category(conn, user_id)?, rng);
    let due_at = end_of_day(today, timezone);
    // Batch membership is keyed on the creation date, so it must fall on `today`.
    let created_at = now.clamp(start_of_day(today, timezone), due_at);
    let templates = DailyQuestRepository::list_templates(conn, Some(category))?;

    for template in templates {
        let template = template.into_template()?;
        let tags: TagSet = [category.as_str(), DAILY_TAG].into_iter().collect();
        let quest = QuestRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: template.name,
            description: Some(template.description),
            target: template.target,
            unit: template.unit,
            tags,
            duration_minutes: template.duration_minutes,
            difficulty: template.difficulty,
            reward: template.base_reward,
            priority: DAILY_QUEST_PRIORITY,
            completed: false,
            completed_at: None,
            created_at,
            due_at: Some(due_at),
        };
        QuestRepository::insert(conn, &QuestRow::from_record(&quest)?)?;
    }

    let assignment = DailyQuestAssignment {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        assigned_date: today,
        category,
        completed: false,
    };
    DailyQuestRepository::insert_assignment(conn, &AssignmentRow::from_assignment(&assignment))?;
    UserRepository::set_last_daily_quest_date(conn, user_id, today)?;

    Ok(Some(assignment))
}
