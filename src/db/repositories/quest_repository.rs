use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::quest::{Difficulty, QuestRecord, TagSet};
use crate::utils::calendar::{format_timestamp, parse_timestamp};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        name,
        description,
        target,
        unit,
        tags,
        duration_minutes,
        difficulty,
        reward,
        priority,
        completed,
        completed_at,
        created_at,
        due_at
    FROM quests
"#;

#[derive(Debug, Clone)]
pub struct QuestRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub target: Option<i64>,
    pub unit: Option<String>,
    pub tags: String,
    pub duration_minutes: i64,
    pub difficulty: String,
    pub reward: i64,
    pub priority: i64,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub due_at: Option<String>,
}

impl QuestRow {
    pub fn from_record(record: &QuestRecord) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            target: record.target,
            unit: record.unit.clone(),
            tags: encode_tags(&record.tags)?,
            duration_minutes: record.duration_minutes,
            difficulty: record.difficulty.as_str().to_string(),
            reward: record.reward,
            priority: i64::from(record.priority),
            completed: record.completed,
            completed_at: record.completed_at.as_ref().map(format_timestamp),
            created_at: format_timestamp(&record.created_at),
            due_at: record.due_at.as_ref().map(format_timestamp),
        })
    }

    pub fn into_record(self) -> AppResult<QuestRecord> {
        let difficulty = self.difficulty.parse::<Difficulty>().unwrap_or_else(|err| {
            warn!(target: "app::db", quest_id = %self.id, error = %err, "unknown difficulty, using default");
            Difficulty::default()
        });
        let priority = u8::try_from(self.priority)
            .map_err(|_| AppError::database(format!("invalid priority {}", self.priority)))?;

        Ok(QuestRecord {
            tags: decode_tags(&self.id, &self.tags),
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            target: self.target,
            unit: self.unit,
            duration_minutes: self.duration_minutes,
            difficulty,
            reward: self.reward,
            priority,
            completed: self.completed,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
            due_at: self.due_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

impl TryFrom<&Row<'_>> for QuestRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(QuestRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            target: row.get("target")?,
            unit: row.get("unit")?,
            tags: row.get::<_, Option<String>>("tags")?.unwrap_or_default(),
            duration_minutes: row.get("duration_minutes")?,
            difficulty: row.get("difficulty")?,
            reward: row.get("reward")?,
            priority: row.get("priority")?,
            completed: row.get::<_, i64>("completed")? != 0,
            completed_at: row.get("completed_at")?,
            created_at: row.get("created_at")?,
            due_at: row.get("due_at")?,
        })
    }
}

pub struct QuestRepository;

impl QuestRepository {
    pub fn insert(conn: &Connection, row: &QuestRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO quests (
                    id,
                    user_id,
                    name,
                    description,
                    target,
                    unit,
                    tags,
                    duration_minutes,
                    difficulty,
                    reward,
                    priority,
                    completed,
                    completed_at,
                    created_at,
                    due_at
                ) VALUES (
                    :id,
                    :user_id,
                    :name,
                    :description,
                    :target,
                    :unit,
                    :tags,
                    :duration_minutes,
                    :difficulty,
                    :reward,
                    :priority,
                    :completed,
                    :completed_at,
                    :created_at,
                    :due_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":name": &row.name,
                ":description": &row.description,
                ":target": &row.target,
                ":unit": &row.unit,
                ":tags": &row.tags,
                ":duration_minutes": row.duration_minutes,
                ":difficulty": &row.difficulty,
                ":reward": row.reward,
                ":priority": row.priority,
                ":completed": row.completed as i64,
                ":completed_at": &row.completed_at,
                ":created_at": &row.created_at,
                ":due_at": &row.due_at,
            },
        )?;

        Ok(())
    }

    /// Updates the editable fields of an incomplete quest. Completion state
    /// is only written by [`QuestRepository::mark_completed`]; a completed
    /// quest is a `Conflict`.
    pub fn update(conn: &Connection, row: &QuestRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE quests SET
                    name = :name,
                    description = :description,
                    target = :target,
                    unit = :unit,
                    tags = :tags,
                    duration_minutes = :duration_minutes,
                    difficulty = :difficulty,
                    reward = :reward,
                    priority = :priority,
                    due_at = :due_at
                WHERE id = :id AND completed = 0
            "#,
            named_params! {
                ":id": &row.id,
                ":name": &row.name,
                ":description": &row.description,
                ":target": &row.target,
                ":unit": &row.unit,
                ":tags": &row.tags,
                ":duration_minutes": row.duration_minutes,
                ":difficulty": &row.difficulty,
                ":reward": row.reward,
                ":priority": row.priority,
                ":due_at": &row.due_at,
            },
        )?;

        if affected == 0 {
            return match Self::find_by_id(conn, &row.id)? {
                Some(_) => Err(AppError::conflict("Completed quests cannot be edited")),
                None => Err(AppError::not_found()),
            };
        }

        Ok(())
    }

    /// Flips `completed` once. Returns `false` when the quest was already
    /// completed, so callers can skip crediting.
    pub fn mark_completed(
        conn: &Connection,
        id: &str,
        completed_at: &DateTime<Utc>,
    ) -> AppResult<bool> {
        let affected = conn.execute(
            "UPDATE quests SET completed = 1, completed_at = ?1 WHERE id = ?2 AND completed = 0",
            (format_timestamp(completed_at), id),
        )?;
        Ok(affected == 1)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM quests WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<QuestRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| QuestRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_by_user(
        conn: &Connection,
        user_id: &str,
        completed: Option<bool>,
    ) -> AppResult<Vec<QuestRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = :user_id AND (:completed IS NULL OR completed = :completed) \
             ORDER BY priority DESC, created_at ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                named_params! {
                    ":user_id": user_id,
                    ":completed": completed.map(i64::from),
                },
                |row| QuestRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Quests created at or after `since`, oldest first.
    pub fn list_created_since(
        conn: &Connection,
        user_id: &str,
        since: &DateTime<Utc>,
    ) -> AppResult<Vec<QuestRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ?1 AND created_at >= ?2 ORDER BY created_at ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map((user_id, format_timestamp(since)), |row| {
                QuestRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn encode_tags(tags: &TagSet) -> AppResult<String> {
    Ok(serde_json::to_string(tags)?)
}

fn decode_tags(quest_id: &str, raw: &str) -> TagSet {
    if raw.trim().is_empty() {
        return TagSet::new();
    }
    match serde_json::from_str::<TagSet>(raw) {
        Ok(tags) => tags,
        Err(err) => {
            warn!(target: "app::db", quest_id = %quest_id, error = %err, "malformed quest tags, treating as empty");
            TagSet::new()
        }
    }
}
