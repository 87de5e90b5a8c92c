use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::db::repositories::quest_repository::{QuestRepository, QuestRow};
use crate::db::repositories::user_repository::{UserRepository, UserRow};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::quest::{
    Difficulty, QuestCompletionResult, QuestCreateInput, QuestRecord, QuestUpdateInput, TagSet,
};
use crate::services::daily_quest_service::{daily_quests_created_on, DailyQuestService};
use crate::services::progression_engine::ProgressionEngine;
use crate::utils::calendar::{local_date, parse_timestamp, week_start};
use crate::utils::clock::SharedClock;

const MAX_NAME_CHARS: usize = 200;
const MAX_TAG_CHARS: usize = 32;
const MAX_TAGS: usize = 30;
const DEFAULT_DURATION_MINUTES: i64 = 30;
const DEFAULT_PRIORITY: u8 = 1;
const PRIORITY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

#[derive(Clone)]
pub struct QuestService {
    db: DbPool,
    clock: SharedClock,
    engine: ProgressionEngine,
}

impl QuestService {
    pub fn new(db: DbPool, clock: SharedClock, engine: ProgressionEngine) -> Self {
        Self { db, clock, engine }
    }

    fn timezone(&self) -> Tz {
        self.engine.timezone()
    }

    pub fn create_quest(&self, user_id: &str, input: QuestCreateInput) -> AppResult<QuestRecord> {
        let now = self.clock.now().trunc_subsecs(0);
        let record = build_record_from_create(user_id, input, now)?;
        let row = QuestRow::from_record(&record)?;

        self.db.with_connection(|conn| {
            UserRepository::find_by_id(conn, user_id)?.ok_or_else(AppError::not_found)?;
            QuestRepository::insert(conn, &row)
        })?;
        info!(target: "app::quests", quest_id = %record.id, user_id, "quest created");
        Ok(record)
    }

    pub fn update_quest(
        &self,
        user_id: &str,
        quest_id: &str,
        update: QuestUpdateInput,
    ) -> AppResult<QuestRecord> {
        let mut existing = self.get_quest(user_id, quest_id)?;
        if existing.completed {
            return Err(AppError::conflict("Completed quests cannot be edited"));
        }
        apply_update(&mut existing, update)?;

        let row = QuestRow::from_record(&existing)?;
        self.db
            .with_connection(|conn| QuestRepository::update(conn, &row))?;
        info!(target: "app::quests", quest_id, user_id, "quest updated");
        Ok(existing)
    }

    pub fn delete_quest(&self, user_id: &str, quest_id: &str) -> AppResult<()> {
        self.get_quest(user_id, quest_id)?;
        self.db
            .with_connection(|conn| QuestRepository::delete(conn, quest_id))?;
        info!(target: "app::quests", quest_id, user_id, "quest deleted");
        Ok(())
    }

    /// Fetches a quest owned by `user_id`; other users' quests are `Unauthorized`.
    pub fn get_quest(&self, user_id: &str, quest_id: &str) -> AppResult<QuestRecord> {
        let record = self
            .db
            .with_connection(|conn| QuestRepository::find_by_id(conn, quest_id))?
            .ok_or_else(AppError::not_found)?
            .into_record()?;
        ensure_owner(&record, user_id)?;
        debug!(target: "app::quests", quest_id, "quest fetched");
        Ok(record)
    }

    /// Incomplete quests excluding generated daily quests, highest priority first.
    pub fn list_active_quests(&self, user_id: &str) -> AppResult<Vec<QuestRecord>> {
        let quests = self
            .list_by_user(user_id, Some(false))?
            .into_iter()
            .filter(|quest| !quest.is_daily())
            .collect::<Vec<_>>();
        debug!(target: "app::quests", user_id, count = quests.len(), "active quests listed");
        Ok(quests)
    }

    pub fn list_completed_quests(&self, user_id: &str) -> AppResult<Vec<QuestRecord>> {
        let quests = self.list_by_user(user_id, Some(true))?;
        debug!(target: "app::quests", user_id, count = quests.len(), "completed quests listed");
        Ok(quests)
    }

    pub fn list_daily_quests(&self, user_id: &str, today: NaiveDate) -> AppResult<Vec<QuestRecord>> {
        let timezone = self.timezone();
        self.db
            .with_connection(|conn| daily_quests_created_on(conn, user_id, today, timezone))
    }

    /// Credits the quest's reward exactly once.
    ///
    /// Marking the quest, crediting the user and refreshing the daily batch
    /// happen in one IMMEDIATE transaction. Completing an already completed
    /// quest returns `outcome: None` and changes nothing.
    pub fn complete_quest(&self, user_id: &str, quest_id: &str) -> AppResult<QuestCompletionResult> {
        let now = self.clock.now().trunc_subsecs(0);
        let timezone = self.timezone();
        let today = local_date(now, timezone);
        let engine = self.engine;

        let result = self.db.with_transaction(|tx| {
            let mut quest = QuestRepository::find_by_id(tx, quest_id)?
                .ok_or_else(AppError::not_found)?
                .into_record()?;
            ensure_owner(&quest, user_id)?;

            if quest.completed || !QuestRepository::mark_completed(tx, quest_id, &now)? {
                debug!(target: "app::quests", quest_id, "quest already completed");
                return Ok(QuestCompletionResult {
                    quest,
                    outcome: None,
                    daily_batch_completed: false,
                });
            }

            UserRepository::roll_over_weekly_points(tx, week_start(today), Some(user_id))?;
            let mut user = UserRepository::find_by_id(tx, user_id)?
                .ok_or_else(AppError::not_found)?
                .into_record()?;
            let outcome = engine.apply_completion(&mut user.progression, quest.reward, now)?;
            UserRepository::update_progression(tx, &UserRow::from_record(&user))?;

            let daily_batch_completed = if quest.is_daily() {
                let batch_date = local_date(quest.created_at, timezone);
                DailyQuestService::refresh_daily_completion(tx, user_id, batch_date, timezone)?
            } else {
                false
            };

            quest.completed = true;
            quest.completed_at = Some(now);
            Ok(QuestCompletionResult {
                quest,
                outcome: Some(outcome),
                daily_batch_completed,
            })
        })?;

        if let Some(outcome) = &result.outcome {
            info!(
                target: "app::quests",
                quest_id,
                user_id,
                points = outcome.points_earned,
                leveled_up = outcome.leveled_up,
                "quest completed"
            );
        }
        Ok(result)
    }

    fn list_by_user(&self, user_id: &str, completed: Option<bool>) -> AppResult<Vec<QuestRecord>> {
        let rows = self
            .db
            .with_connection(|conn| QuestRepository::list_by_user(conn, user_id, completed))?;
        rows.into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()
    }
}

fn ensure_owner(quest: &QuestRecord, user_id: &str) -> AppResult<()> {
    if quest.user_id != user_id {
        return Err(AppError::unauthorized());
    }
    Ok(())
}

fn build_record_from_create(
    user_id: &str,
    mut input: QuestCreateInput,
    now: DateTime<Utc>,
) -> AppResult<QuestRecord> {
    Ok(QuestRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        name: normalize_name(&input.name)?,
        description: normalize_optional_string(input.description.take()),
        target: normalize_target(input.target)?,
        unit: normalize_optional_string(input.unit.take()),
        tags: normalize_tags(input.tags.take().unwrap_or_default())?,
        duration_minutes: normalize_duration(input.duration_minutes)?,
        difficulty: normalize_difficulty(input.difficulty.take())?,
        reward: normalize_reward(input.reward)?,
        priority: normalize_priority(input.priority)?,
        completed: false,
        completed_at: None,
        created_at: now,
        due_at: normalize_datetime_opt(input.due_at.take())?,
    })
}

fn apply_update(record: &mut QuestRecord, update: QuestUpdateInput) -> AppResult<()> {
    if let Some(name) = update.name {
        record.name = normalize_name(&name)?;
    }

    if let Some(description) = update.description {
        record.description = normalize_optional_string(description);
    }

    if let Some(tags) = update.tags {
        record.tags = normalize_tags(tags)?;
    }

    if let Some(duration) = update.duration_minutes {
        record.duration_minutes = normalize_duration(Some(duration))?;
    }

    if let Some(difficulty) = update.difficulty {
        record.difficulty = normalize_difficulty(Some(difficulty))?;
    }

    if let Some(reward) = update.reward {
        record.reward = normalize_reward(reward)?;
    }

    if let Some(priority) = update.priority {
        record.priority = normalize_priority(Some(priority))?;
    }

    if let Some(due_at) = update.due_at {
        record.due_at = normalize_datetime_opt(due_at)?;
    }

    Ok(())
}

fn normalize_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Quest name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::validation(format!(
            "Quest name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn normalize_target(value: Option<i64>) -> AppResult<Option<i64>> {
    match value {
        Some(target) if target <= 0 => Err(AppError::validation("Target must be positive")),
        other => Ok(other),
    }
}

fn normalize_duration(value: Option<i64>) -> AppResult<i64> {
    let minutes = value.unwrap_or(DEFAULT_DURATION_MINUTES);
    if minutes <= 0 {
        return Err(AppError::validation("Duration must be greater than 0 minutes"));
    }
    if minutes > 60 * 24 * 30 {
        return Err(AppError::validation("Duration cannot exceed 30 days"));
    }
    Ok(minutes)
}

fn normalize_difficulty(value: Option<String>) -> AppResult<Difficulty> {
    match value {
        None => Ok(Difficulty::default()),
        Some(raw) if raw.trim().is_empty() => Ok(Difficulty::default()),
        Some(raw) => raw.parse::<Difficulty>().map_err(AppError::validation),
    }
}

fn normalize_reward(reward: i64) -> AppResult<i64> {
    if reward <= 0 {
        return Err(AppError::validation_with_details(
            "Reward must be a positive number of points",
            serde_json::json!({ "reward": reward }),
        ));
    }
    Ok(reward)
}

fn normalize_priority(priority: Option<u8>) -> AppResult<u8> {
    let value = priority.unwrap_or(DEFAULT_PRIORITY);
    if PRIORITY_RANGE.contains(&value) {
        Ok(value)
    } else {
        Err(AppError::validation("Priority must be between 1 and 5"))
    }
}

fn normalize_datetime_opt(value: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    match value {
        Some(raw) if !raw.trim().is_empty() => parse_timestamp(&raw).map(Some),
        _ => Ok(None),
    }
}

fn normalize_tags(values: Vec<String>) -> AppResult<TagSet> {
    let mut result = TagSet::new();

    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_TAG_CHARS {
            return Err(AppError::validation(format!(
                "Each tag must be at most {MAX_TAG_CHARS} characters"
            )));
        }
        result.insert(trimmed.to_lowercase());
        if result.len() > MAX_TAGS {
            return Err(AppError::validation(format!("At most {MAX_TAGS} tags are allowed")));
        }
    }

    Ok(result)
}
