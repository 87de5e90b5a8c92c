use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::progression::{LevelProgress, ProgressionState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(flatten)]
    pub progression: ProgressionState,
    /// Monday of the week `points_this_week` belongs to.
    pub points_week_start: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub points: i64,
    pub level: u32,
    pub streak: u32,
    pub points_this_week: i64,
    pub achievements: Vec<String>,
    pub level_progress: LevelProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_points: i64,
    pub points_this_week: i64,
    pub streak: u32,
    pub achievements: Vec<String>,
    pub active_quests: usize,
    pub completed_quests: usize,
}
