use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::quest::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestCategory {
    Strength,
    Intelligence,
    Agility,
}

impl QuestCategory {
    pub const ALL: [QuestCategory; 3] = [
        QuestCategory::Strength,
        QuestCategory::Intelligence,
        QuestCategory::Agility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestCategory::Strength => "strength",
            QuestCategory::Intelligence => "intelligence",
            QuestCategory::Agility => "agility",
        }
    }
}

impl fmt::Display for QuestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strength" => Ok(QuestCategory::Strength),
            "intelligence" => Ok(QuestCategory::Intelligence),
            "agility" => Ok(QuestCategory::Agility),
            _ => Err(format!("Invalid quest category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuestTemplate {
    pub id: i64,
    pub category: QuestCategory,
    pub name: String,
    pub description: String,
    pub base_reward: i64,
    pub duration_minutes: i64,
    pub target: Option<i64>,
    pub unit: Option<String>,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuestAssignment {
    pub id: String,
    pub user_id: String,
    pub assigned_date: NaiveDate,
    pub category: QuestCategory,
    pub completed: bool,
}
