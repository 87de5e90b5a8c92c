use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::daily_quest::{DailyQuestAssignment, DailyQuestTemplate, QuestCategory};
use crate::services::quest_templates::TEMPLATE_CATALOG;
use crate::utils::calendar::{format_date, parse_date};

const TEMPLATE_SELECT: &str = r#"
    SELECT
        id,
        category,
        name,
        description,
        base_reward,
        duration_minutes,
        target,
        unit,
        difficulty
    FROM daily_quest_templates
"#;

const ASSIGNMENT_SELECT: &str = r#"
    SELECT
        id,
        user_id,
        assigned_date,
        category,
        completed
    FROM daily_quest_assignments
"#;

#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub id: i64,
    pub category: String,
    pub name: String,
    pub description: String,
    pub base_reward: i64,
    pub duration_minutes: i64,
    pub target: Option<i64>,
    pub unit: Option<String>,
    pub difficulty: String,
}

impl TemplateRow {
    pub fn into_template(self) -> AppResult<DailyQuestTemplate> {
        Ok(DailyQuestTemplate {
            id: self.id,
            category: self.category.parse().map_err(AppError::database)?,
            name: self.name,
            description: self.description,
            base_reward: self.base_reward,
            duration_minutes: self.duration_minutes,
            target: self.target,
            unit: self.unit,
            difficulty: self.difficulty.parse().map_err(AppError::database)?,
        })
    }
}

impl TryFrom<&Row<'_>> for TemplateRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(TemplateRow {
            id: row.get("id")?,
            category: row.get("category")?,
            name: row.get("name")?,
            description: row.get("description")?,
            base_reward: row.get("base_reward")?,
            duration_minutes: row.get("duration_minutes")?,
            target: row.get("target")?,
            unit: row.get("unit")?,
            difficulty: row.get("difficulty")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub id: String,
    pub user_id: String,
    pub assigned_date: String,
    pub category: String,
    pub completed: bool,
}

impl AssignmentRow {
    pub fn from_assignment(assignment: &DailyQuestAssignment) -> Self {
        Self {
            id: assignment.id.clone(),
            user_id: assignment.user_id.clone(),
            assigned_date: format_date(&assignment.assigned_date),
            category: assignment.category.as_str().to_string(),
            completed: assignment.completed,
        }
    }

    pub fn into_assignment(self) -> AppResult<DailyQuestAssignment> {
        Ok(DailyQuestAssignment {
            assigned_date: parse_date(&self.assigned_date)?,
            category: self.category.parse().map_err(AppError::database)?,
            id: self.id,
            user_id: self.user_id,
            completed: self.completed,
        })
    }
}

impl TryFrom<&Row<'_>> for AssignmentRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(AssignmentRow {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            assigned_date: row.get("assigned_date")?,
            category: row.get("category")?,
            completed: row.get::<_, i64>("completed")? != 0,
        })
    }
}

pub struct DailyQuestRepository;

impl DailyQuestRepository {
    /// Inserts the built-in catalog when the template table is empty.
    /// Returns how many templates were written.
    pub fn seed_templates(conn: &Connection) -> AppResult<usize> {
        if Self::count_templates(conn)? > 0 {
            return Ok(0);
        }

        let mut stmt = conn.prepare(
            r#"
                INSERT INTO daily_quest_templates (
                    category,
                    name,
                    description,
                    base_reward,
                    duration_minutes,
                    target,
                    unit,
                    difficulty
                ) VALUES (
                    :category,
                    :name,
                    :description,
                    :base_reward,
                    :duration_minutes,
                    :target,
                    :unit,
                    :difficulty
                )
            "#,
        )?;

        for template in TEMPLATE_CATALOG {
            stmt.execute(named_params! {
                ":category": template.category.as_str(),
                ":name": template.name,
                ":description": template.description,
                ":base_reward": template.base_reward,
                ":duration_minutes": template.duration_minutes,
                ":target": template.target,
                ":unit": template.unit,
                ":difficulty": template.difficulty.as_str(),
            })?;
        }

        Ok(TEMPLATE_CATALOG.len())
    }

    pub fn count_templates(conn: &Connection) -> AppResult<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM daily_quest_templates", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    pub fn list_templates(
        conn: &Connection,
        category: Option<QuestCategory>,
    ) -> AppResult<Vec<TemplateRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE (:category IS NULL OR category = :category) ORDER BY id ASC",
            TEMPLATE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                named_params! { ":category": category.map(QuestCategory::as_str) },
                |row| TemplateRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_assignment(conn: &Connection, row: &AssignmentRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO daily_quest_assignments (id, user_id, assigned_date, category, completed)
                VALUES (:id, :user_id, :assigned_date, :category, :completed)
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":assigned_date": &row.assigned_date,
                ":category": &row.category,
                ":completed": row.completed as i64,
            },
        )?;
        Ok(())
    }

    /// Most recent assignment for the user, used to avoid repeating a category.
    pub fn find_latest_assignment(
        conn: &Connection,
        user_id: &str,
    ) -> AppResult<Option<AssignmentRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ?1 ORDER BY assigned_date DESC LIMIT 1",
            ASSIGNMENT_SELECT
        ))?;
        let row = stmt
            .query_row([user_id], |row| AssignmentRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn find_assignment(
        conn: &Connection,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<Option<AssignmentRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ?1 AND assigned_date = ?2",
            ASSIGNMENT_SELECT
        ))?;
        let row = stmt
            .query_row((user_id, format_date(&date)), |row| {
                AssignmentRow::try_from(row)
            })
            .optional()?;
        Ok(row)
    }

    /// Marks the assignment for `(user_id, date)` completed. Returns `true`
    /// only on the transition from incomplete to complete.
    pub fn mark_assignment_completed(
        conn: &Connection,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<bool> {
        let affected = conn.execute(
            r#"
                UPDATE daily_quest_assignments SET completed = 1
                WHERE user_id = ?1 AND assigned_date = ?2 AND completed = 0
            "#,
            (user_id, format_date(&date)),
        )?;
        Ok(affected == 1)
    }
}
