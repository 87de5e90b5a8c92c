use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::progression::{AchievementId, AchievementSet, ProgressionState};
use crate::models::user::UserRecord;
use crate::utils::calendar::{format_date, format_timestamp, parse_date, parse_timestamp};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        username,
        password_hash,
        points,
        level,
        streak,
        last_completed_at,
        points_this_week,
        points_week_start,
        achievements,
        last_daily_quest_date,
        created_at
    FROM users
"#;

const ACHIEVEMENT_DELIMITER: &str = ";";

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub points: i64,
    pub level: i64,
    pub streak: i64,
    pub last_completed_at: Option<String>,
    pub points_this_week: i64,
    pub points_week_start: Option<String>,
    pub achievements: String,
    pub last_daily_quest_date: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn from_record(record: &UserRecord) -> Self {
        let progression = &record.progression;
        Self {
            id: record.id.clone(),
            username: record.username.clone(),
            password_hash: record.password_hash.clone(),
            points: progression.points,
            level: i64::from(progression.level),
            streak: i64::from(progression.streak),
            last_completed_at: progression.last_completed_at.as_ref().map(format_timestamp),
            points_this_week: progression.points_this_week,
            points_week_start: record.points_week_start.as_ref().map(format_date),
            achievements: encode_achievements(&progression.unlocked_achievements),
            last_daily_quest_date: progression.last_daily_quest_date.as_ref().map(format_date),
            created_at: format_timestamp(&record.created_at),
        }
    }

    pub fn into_record(self) -> AppResult<UserRecord> {
        let progression = ProgressionState {
            points: self.points,
            level: u32::try_from(self.level)
                .map_err(|_| AppError::database(format!("invalid level {}", self.level)))?,
            streak: u32::try_from(self.streak)
                .map_err(|_| AppError::database(format!("invalid streak {}", self.streak)))?,
            last_completed_at: self
                .last_completed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            points_this_week: self.points_this_week,
            unlocked_achievements: decode_achievements(&self.achievements),
            last_daily_quest_date: parse_optional_date(self.last_daily_quest_date.as_deref())?,
        };

        Ok(UserRecord {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            progression,
            points_week_start: parse_optional_date(self.points_week_start.as_deref())?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for UserRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(UserRow {
            id: row.get("id")?,
            username: row.get("username")?,
            password_hash: row.get("password_hash")?,
            points: row.get("points")?,
            level: row.get("level")?,
            streak: row.get("streak")?,
            last_completed_at: row.get("last_completed_at")?,
            points_this_week: row.get("points_this_week")?,
            points_week_start: row.get("points_week_start")?,
            achievements: row.get::<_, Option<String>>("achievements")?.unwrap_or_default(),
            last_daily_quest_date: row.get("last_daily_quest_date")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct UserRepository;

impl UserRepository {
    pub fn insert(conn: &Connection, row: &UserRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO users (
                    id,
                    username,
                    password_hash,
                    points,
                    level,
                    streak,
                    last_completed_at,
                    points_this_week,
                    points_week_start,
                    achievements,
                    last_daily_quest_date,
                    created_at
                ) VALUES (
                    :id,
                    :username,
                    :password_hash,
                    :points,
                    :level,
                    :streak,
                    :last_completed_at,
                    :points_this_week,
                    :points_week_start,
                    :achievements,
                    :last_daily_quest_date,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":username": &row.username,
                ":password_hash": &row.password_hash,
                ":points": row.points,
                ":level": row.level,
                ":streak": row.streak,
                ":last_completed_at": &row.last_completed_at,
                ":points_this_week": row.points_this_week,
                ":points_week_start": &row.points_week_start,
                ":achievements": &row.achievements,
                ":last_daily_quest_date": &row.last_daily_quest_date,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    /// Persists the progression columns; identity and credentials are untouched.
    pub fn update_progression(conn: &Connection, row: &UserRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE users SET
                    points = :points,
                    level = :level,
                    streak = :streak,
                    last_completed_at = :last_completed_at,
                    points_this_week = :points_this_week,
                    points_week_start = :points_week_start,
                    achievements = :achievements,
                    last_daily_quest_date = :last_daily_quest_date
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":points": row.points,
                ":level": row.level,
                ":streak": row.streak,
                ":last_completed_at": &row.last_completed_at,
                ":points_this_week": row.points_this_week,
                ":points_week_start": &row.points_week_start,
                ":achievements": &row.achievements,
                ":last_daily_quest_date": &row.last_daily_quest_date,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn set_last_daily_quest_date(
        conn: &Connection,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE users SET last_daily_quest_date = ?1 WHERE id = ?2",
            (format_date(&date), user_id),
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    /// Zeroes `points_this_week` for every user whose counter belongs to a
    /// week before `week_start`. Returns the number of users rolled over.
    pub fn roll_over_weekly_points(
        conn: &Connection,
        week_start: NaiveDate,
        user_id: Option<&str>,
    ) -> AppResult<usize> {
        let affected = conn.execute(
            r#"
                UPDATE users SET
                    points_this_week = 0,
                    points_week_start = :week_start
                WHERE (points_week_start IS NULL OR points_week_start < :week_start)
                  AND (:user_id IS NULL OR id = :user_id)
            "#,
            named_params! {
                ":week_start": format_date(&week_start),
                ":user_id": user_id,
            },
        )?;
        Ok(affected)
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<UserRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| UserRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn find_by_username(conn: &Connection, username: &str) -> AppResult<Option<UserRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE username = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([username], |row| UserRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn count(conn: &Connection) -> AppResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn encode_achievements(set: &AchievementSet) -> String {
    set.iter()
        .map(AchievementId::as_str)
        .collect::<Vec<_>>()
        .join(ACHIEVEMENT_DELIMITER)
}

/// Unknown or malformed entries are dropped rather than failing the load.
fn decode_achievements(raw: &str) -> AchievementSet {
    raw.split(ACHIEVEMENT_DELIMITER)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| match value.parse::<AchievementId>() {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(target: "app::db", error = %err, "skipping unknown achievement id");
                None
            }
        })
        .collect()
}

fn parse_optional_date(raw: Option<&str>) -> AppResult<Option<NaiveDate>> {
    raw.filter(|value| !value.trim().is_empty())
        .map(parse_date)
        .transpose()
}
