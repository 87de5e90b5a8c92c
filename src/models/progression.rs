use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Highest level reachable through the level table.
pub const MAX_LEVEL: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementId {
    WeekWarrior,
    StreakMaster,
    LevelMaster,
    PointsProdigy,
    WeekChampion,
    StreakLegend,
    MonthlyGrinder,
    StreakMarathoner,
    HalfwayHero,
    StreakStarter,
    WeekContributor,
    LifelongLearner,
}

impl AchievementId {
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementId::WeekWarrior => "WEEK_WARRIOR",
            AchievementId::StreakMaster => "STREAK_MASTER",
            AchievementId::LevelMaster => "LEVEL_MASTER",
            AchievementId::PointsProdigy => "POINTS_PRODIGY",
            AchievementId::WeekChampion => "WEEK_CHAMPION",
            AchievementId::StreakLegend => "STREAK_LEGEND",
            AchievementId::MonthlyGrinder => "MONTHLY_GRINDER",
            AchievementId::StreakMarathoner => "STREAK_MARATHONER",
            AchievementId::HalfwayHero => "HALFWAY_HERO",
            AchievementId::StreakStarter => "STREAK_STARTER",
            AchievementId::WeekContributor => "WEEK_CONTRIBUTOR",
            AchievementId::LifelongLearner => "LIFELONG_LEARNER",
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WEEK_WARRIOR" => Ok(AchievementId::WeekWarrior),
            "STREAK_MASTER" => Ok(AchievementId::StreakMaster),
            "LEVEL_MASTER" => Ok(AchievementId::LevelMaster),
            "POINTS_PRODIGY" => Ok(AchievementId::PointsProdigy),
            "WEEK_CHAMPION" => Ok(AchievementId::WeekChampion),
            "STREAK_LEGEND" => Ok(AchievementId::StreakLegend),
            "MONTHLY_GRINDER" => Ok(AchievementId::MonthlyGrinder),
            "STREAK_MARATHONER" => Ok(AchievementId::StreakMarathoner),
            "HALFWAY_HERO" => Ok(AchievementId::HalfwayHero),
            "STREAK_STARTER" => Ok(AchievementId::StreakStarter),
            "WEEK_CONTRIBUTOR" => Ok(AchievementId::WeekContributor),
            "LIFELONG_LEARNER" => Ok(AchievementId::LifelongLearner),
            _ => Err(format!("Unknown achievement id: {}", s)),
        }
    }
}

/// Unlocked achievements in unlock order. Members are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AchievementId>", into = "Vec<AchievementId>")]
pub struct AchievementSet(Vec<AchievementId>);

impl AchievementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: AchievementId) -> bool {
        self.0.contains(&id)
    }

    /// Appends `id`; returns `true` when it was not present before.
    pub fn insert(&mut self, id: AchievementId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = AchievementId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_subset(&self, other: &AchievementSet) -> bool {
        self.iter().all(|id| other.contains(id))
    }
}

impl FromIterator<AchievementId> for AchievementSet {
    fn from_iter<I: IntoIterator<Item = AchievementId>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl From<Vec<AchievementId>> for AchievementSet {
    fn from(ids: Vec<AchievementId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<AchievementSet> for Vec<AchievementId> {
    fn from(set: AchievementSet) -> Self {
        set.0
    }
}

/// Per-user state mutated by the progression engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionState {
    pub points: i64,
    pub level: u32,
    pub streak: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub points_this_week: i64,
    pub unlocked_achievements: AchievementSet,
    pub last_daily_quest_date: Option<NaiveDate>,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            points: 0,
            level: 1,
            streak: 0,
            last_completed_at: None,
            points_this_week: 0,
            unlocked_achievements: AchievementSet::new(),
            last_daily_quest_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub points_earned: i64,
    pub leveled_up: bool,
    pub new_level: Option<u32>,
    pub newly_unlocked_achievements: Vec<AchievementId>,
}

impl CompletionOutcome {
    pub fn level_up_message(&self) -> Option<String> {
        self.new_level
            .filter(|_| self.leveled_up)
            .map(|level| format!("Congratulations! You've reached level {level}!"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    pub points: i64,
    pub points_to_next_level: Option<i64>,
    pub progress_percentage: f64,
}
